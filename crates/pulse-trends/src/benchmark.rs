//! Long-run benchmark rates from full entity history

use crate::delta::DeltaExtractor;
use crate::stats::benchmark_average;
use crate::types::BenchmarkProfile;
use pulse_common::{MetricKind, MetricName, PulseError, Result, Sample};
use tracing::{debug, instrument};

/// Default minimum history size before a benchmark is shown
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Computes per-week and per-month average rates from an entity's complete
/// snapshot history.
///
/// Sparse histories are suppressed rather than reported as zero; a
/// benchmark built on a handful of snapshots would be a misleading
/// comparison baseline.
#[derive(Debug)]
pub struct BenchmarkCalculator {
    min_samples: usize,
}

impl BenchmarkCalculator {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Compute the benchmark for one count metric, or `None` when the
    /// history is too sparse or the accumulated total is zero.
    #[instrument(skip(self, samples), fields(samples = samples.len(), metric = %metric))]
    pub fn compute(
        &self,
        samples: &[Sample],
        metric: MetricName,
    ) -> Result<Option<BenchmarkProfile>> {
        if metric.kind() != MetricKind::Count {
            return Err(PulseError::validation_field(
                format!("benchmark is undefined for rate metric '{}'", metric),
                metric.as_str(),
            ));
        }

        let sample_count = samples.len();
        if sample_count < self.min_samples {
            debug!(
                sample_count,
                min_samples = self.min_samples,
                "history too sparse, benchmark unavailable"
            );
            return Ok(None);
        }

        let deltas = DeltaExtractor::new().extract(samples)?;

        // Accumulated growth over the observed span; the cold-start point
        // is an absolute value, not an increment, and is excluded.
        let total: u64 = deltas.iter().skip(1).map(|d| d.count(metric)).sum();
        if total == 0 {
            debug!("zero accumulated total, benchmark unavailable");
            return Ok(None);
        }

        let first_ts = samples[0].bucket_ts;
        let last_ts = samples[sample_count - 1].bucket_ts;
        let elapsed_days = (last_ts - first_ts).num_seconds() as f64 / 86_400.0;

        Ok(Some(BenchmarkProfile {
            metric,
            avg_per_week: benchmark_average(total as f64, elapsed_days, 7.0),
            avg_per_month: benchmark_average(total as f64, elapsed_days, 30.0),
            sample_count,
            elapsed_days,
        }))
    }
}

impl Default for BenchmarkCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}
