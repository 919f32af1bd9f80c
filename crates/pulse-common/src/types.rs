//! Common types used across the pulse engine

use crate::error::{PulseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform-assigned identifier for a post or account
pub type EntityId = String;

/// Timestamp type used throughout the engine
pub type Timestamp = DateTime<Utc>;

/// The closed set of recognized metrics.
///
/// Snapshot rows may carry additional keys; anything not listed here is
/// rejected at the ingestion boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Views,
    Likes,
    Replies,
    Reposts,
    Quotes,
    Followers,
    EngagementRate,
}

/// Whether a metric accumulates over time or describes a point-in-time ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Cumulative all-time counter; trends are derived from increments
    Count,
    /// Ratio or score; carried through as-is, never differenced
    Rate,
}

impl MetricName {
    /// All recognized metrics
    pub const ALL: [MetricName; 7] = [
        MetricName::Views,
        MetricName::Likes,
        MetricName::Replies,
        MetricName::Reposts,
        MetricName::Quotes,
        MetricName::Followers,
        MetricName::EngagementRate,
    ];

    /// The count metrics that make up an interaction for engagement purposes
    pub const INTERACTIONS: [MetricName; 4] = [
        MetricName::Likes,
        MetricName::Replies,
        MetricName::Reposts,
        MetricName::Quotes,
    ];

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricName::Views
            | MetricName::Likes
            | MetricName::Replies
            | MetricName::Reposts
            | MetricName::Quotes
            | MetricName::Followers => MetricKind::Count,
            MetricName::EngagementRate => MetricKind::Rate,
        }
    }

    /// Wire key as it appears in snapshot rows
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Views => "views",
            MetricName::Likes => "likes",
            MetricName::Replies => "replies",
            MetricName::Reposts => "reposts",
            MetricName::Quotes => "quotes",
            MetricName::Followers => "followers",
            MetricName::EngagementRate => "engagement_rate",
        }
    }

    /// Parse a wire key. Returns `None` for unrecognized keys.
    pub fn from_key(key: &str) -> Option<MetricName> {
        MetricName::ALL.iter().copied().find(|m| m.as_str() == key)
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One absolute-value snapshot of a metric set for one entity at one time.
///
/// Count values are cumulative all-time totals as of `bucket_ts`; rate
/// values are the ratio at that instant. Values for a fixed entity are
/// expected non-decreasing over time, but corrections and resyncs can
/// violate that and must not crash downstream processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub entity_id: EntityId,
    pub bucket_ts: Timestamp,
    pub counts: BTreeMap<MetricName, u64>,
    pub rates: BTreeMap<MetricName, f64>,
}

impl Sample {
    /// Build a sample, checking that every metric sits in the map matching
    /// its kind.
    pub fn new(
        entity_id: impl Into<EntityId>,
        bucket_ts: Timestamp,
        counts: BTreeMap<MetricName, u64>,
        rates: BTreeMap<MetricName, f64>,
    ) -> Result<Self> {
        for metric in counts.keys() {
            if metric.kind() != MetricKind::Count {
                return Err(PulseError::validation_field(
                    format!("metric '{}' is not a count metric", metric),
                    metric.as_str(),
                ));
            }
        }
        for metric in rates.keys() {
            if metric.kind() != MetricKind::Rate {
                return Err(PulseError::validation_field(
                    format!("metric '{}' is not a rate metric", metric),
                    metric.as_str(),
                ));
            }
        }
        Ok(Self {
            entity_id: entity_id.into(),
            bucket_ts,
            counts,
            rates,
        })
    }

    /// Look up a count metric, treating absence as zero
    pub fn count(&self, metric: MetricName) -> u64 {
        self.counts.get(&metric).copied().unwrap_or(0)
    }
}
