//! Report settings with file loading and environment overrides
//!
//! Settings are plain data handed to the engine per invocation; nothing in
//! the aggregation path reads configuration from the environment on its
//! own.

use crate::benchmark::DEFAULT_MIN_SAMPLES;
use pulse_common::{MetricKind, MetricName, Result as PulseResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

/// Settings for one report-generation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Count metric buckets and contributor rankings are keyed by
    pub primary_metric: MetricName,
    /// Minimum history size before a benchmark is shown
    pub min_benchmark_samples: usize,
    /// Minutes east of UTC for heatmap local-time binning
    pub utc_offset_minutes: i32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            primary_metric: MetricName::Views,
            min_benchmark_samples: DEFAULT_MIN_SAMPLES,
            utc_offset_minutes: 0,
        }
    }
}

impl ReportSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.primary_metric.kind() != MetricKind::Count {
            return Err(SettingsError::Invalid(format!(
                "primary_metric '{}' must be a count metric",
                self.primary_metric
            )));
        }
        if self.utc_offset_minutes.abs() > 14 * 60 {
            return Err(SettingsError::Invalid(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

/// Settings loading errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O error when reading the settings file
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParse {
        var: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Settings failed validation
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

impl From<SettingsError> for pulse_common::PulseError {
    fn from(err: SettingsError) -> Self {
        pulse_common::PulseError::config(err.to_string())
    }
}

/// Settings loader for the reporting engine
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a YAML file with environment variable overrides
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<ReportSettings, SettingsError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut settings: ReportSettings = serde_yaml::from_str(&content)?;

        Self::apply_env_overrides(&mut settings)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Load settings from the conventional locations.
    ///
    /// Order: `PULSE_CONFIG_PATH`, then `pulse.yaml` in the working
    /// directory, then built-in defaults; environment overrides apply in
    /// every case.
    pub fn load() -> PulseResult<ReportSettings> {
        let settings = if let Ok(config_path) = env::var("PULSE_CONFIG_PATH") {
            Self::load_file(&config_path)?
        } else if Path::new("pulse.yaml").exists() {
            Self::load_file("pulse.yaml")?
        } else {
            let mut settings = ReportSettings::default();
            Self::apply_env_overrides(&mut settings).map_err(pulse_common::PulseError::from)?;
            settings.validate().map_err(pulse_common::PulseError::from)?;
            settings
        };

        Ok(settings)
    }

    fn apply_env_overrides(settings: &mut ReportSettings) -> Result<(), SettingsError> {
        if let Ok(metric) = env::var("PULSE_PRIMARY_METRIC") {
            settings.primary_metric =
                MetricName::from_key(&metric).ok_or_else(|| SettingsError::EnvParse {
                    var: "PULSE_PRIMARY_METRIC".to_string(),
                    source: format!("unrecognized metric '{}'", metric).into(),
                })?;
        }

        if let Ok(min_samples) = env::var("PULSE_MIN_BENCHMARK_SAMPLES") {
            settings.min_benchmark_samples =
                min_samples.parse().map_err(|e| SettingsError::EnvParse {
                    var: "PULSE_MIN_BENCHMARK_SAMPLES".to_string(),
                    source: Box::new(e),
                })?;
        }

        if let Ok(offset) = env::var("PULSE_UTC_OFFSET_MINUTES") {
            settings.utc_offset_minutes = offset.parse().map_err(|e| SettingsError::EnvParse {
                var: "PULSE_UTC_OFFSET_MINUTES".to_string(),
                source: Box::new(e),
            })?;
        }

        Ok(())
    }
}
