//! Fetch abstraction the aggregation engine consumes.
//!
//! The engine never talks to storage or the network directly; callers hand
//! it a [`SampleSource`] and the engine awaits complete in-memory datasets
//! from it before aggregating.

use crate::error::Result;
use crate::types::{EntityId, Sample, Timestamp};
use async_trait::async_trait;

/// Snapshot resolution a history fetch is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
}

impl Granularity {
    /// Wire value used in fetch query parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

/// Source of snapshot history for posts and accounts.
///
/// Implementations must return rows sorted by `bucket_ts` and free of
/// duplicate `(entity_id, bucket_ts)` pairs; the delta extractor treats a
/// violation as a precondition error rather than repairing it.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch snapshot history for a set of entities since a cutoff.
    async fn fetch_samples(
        &self,
        entity_ids: &[EntityId],
        granularity: Granularity,
        since: Timestamp,
    ) -> Result<Vec<Sample>>;

    /// Fetch the complete snapshot history for one entity.
    ///
    /// Used only for long-run benchmark rates.
    async fn fetch_all_time_samples(&self, entity_id: &EntityId) -> Result<Vec<Sample>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_wire_values() {
        assert_eq!(Granularity::Hour.as_str(), "hour");
        assert_eq!(Granularity::Day.as_str(), "day");
    }
}
