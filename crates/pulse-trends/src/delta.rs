//! Snapshot-to-delta conversion for one entity's sample series

use crate::types::DeltaPoint;
use pulse_common::{PulseError, Result, Sample};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Converts cumulative snapshots into per-interval increments.
///
/// Input must be a chronologically sorted, duplicate-free series for a
/// single entity; violations are precondition errors, never repaired here.
#[derive(Debug, Default)]
pub struct DeltaExtractor;

impl DeltaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract one delta point per sample.
    ///
    /// The first sample has no prior reference and its absolute counts are
    /// taken as its own delta (cold start). For later samples the count
    /// delta is clamped at zero, so a downward correction or resync shows
    /// up as a zero increment rather than a negative one. Rate metrics are
    /// never differenced; each delta point carries its own sample's rates.
    #[instrument(skip(self, samples), fields(samples = samples.len()))]
    pub fn extract(&self, samples: &[Sample]) -> Result<Vec<DeltaPoint>> {
        let Some(first) = samples.first() else {
            return Ok(Vec::new());
        };

        self.check_preconditions(samples)?;

        let mut deltas = Vec::with_capacity(samples.len());
        deltas.push(DeltaPoint {
            entity_id: first.entity_id.clone(),
            bucket_ts: first.bucket_ts,
            counts: first.counts.clone(),
            rates: first.rates.clone(),
        });

        for pair in samples.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let mut counts = BTreeMap::new();
            for (metric, value) in &curr.counts {
                let prev_value = prev.count(*metric);
                if *value < prev_value {
                    debug!(
                        entity_id = %curr.entity_id,
                        metric = %metric,
                        prev = prev_value,
                        curr = value,
                        "downward correction clamped to zero delta"
                    );
                }
                counts.insert(*metric, value.saturating_sub(prev_value));
            }
            deltas.push(DeltaPoint {
                entity_id: curr.entity_id.clone(),
                bucket_ts: curr.bucket_ts,
                counts,
                rates: curr.rates.clone(),
            });
        }

        Ok(deltas)
    }

    fn check_preconditions(&self, samples: &[Sample]) -> Result<()> {
        let entity_id = &samples[0].entity_id;
        for pair in samples.windows(2) {
            if pair[1].entity_id != *entity_id {
                return Err(PulseError::ordering(
                    entity_id.clone(),
                    format!("series mixes entity '{}'", pair[1].entity_id),
                ));
            }
            if pair[1].bucket_ts == pair[0].bucket_ts {
                return Err(PulseError::ordering(
                    entity_id.clone(),
                    format!("duplicate timestamp {}", pair[0].bucket_ts),
                ));
            }
            if pair[1].bucket_ts < pair[0].bucket_ts {
                return Err(PulseError::ordering(
                    entity_id.clone(),
                    format!(
                        "timestamps not sorted: {} follows {}",
                        pair[1].bucket_ts, pair[0].bucket_ts
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_common::{MetricName, Timestamp};

    fn ts(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn sample(entity: &str, hour: u32, views: u64) -> Sample {
        let mut counts = BTreeMap::new();
        counts.insert(MetricName::Views, views);
        Sample::new(entity, ts(hour), counts, BTreeMap::new()).unwrap()
    }

    fn sample_with_rate(entity: &str, hour: u32, views: u64, rate: f64) -> Sample {
        let mut counts = BTreeMap::new();
        counts.insert(MetricName::Views, views);
        let mut rates = BTreeMap::new();
        rates.insert(MetricName::EngagementRate, rate);
        Sample::new(entity, ts(hour), counts, rates).unwrap()
    }

    #[test]
    fn test_cold_start_and_clamped_correction() {
        let samples = vec![
            sample("post:1", 0, 100),
            sample("post:1", 1, 150),
            sample("post:1", 2, 140),
        ];

        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        let views: Vec<u64> = deltas.iter().map(|d| d.count(MetricName::Views)).collect();
        assert_eq!(views, vec![100, 50, 0]);
    }

    #[test]
    fn test_empty_series() {
        let deltas = DeltaExtractor::new().extract(&[]).unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_single_sample_is_its_own_delta() {
        let deltas = DeltaExtractor::new()
            .extract(&[sample("post:1", 5, 42)])
            .unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].count(MetricName::Views), 42);
        assert_eq!(deltas[0].bucket_ts, ts(5));
    }

    #[test]
    fn test_rates_pass_through_later_value() {
        let samples = vec![
            sample_with_rate("post:1", 0, 100, 0.05),
            sample_with_rate("post:1", 1, 150, 0.08),
        ];

        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        assert_eq!(deltas[0].rates.get(&MetricName::EngagementRate), Some(&0.05));
        // The second delta carries the second sample's rate, not a difference
        assert_eq!(deltas[1].rates.get(&MetricName::EngagementRate), Some(&0.08));
    }

    #[test]
    fn test_unsorted_input_fails_fast() {
        let samples = vec![sample("post:1", 2, 140), sample("post:1", 1, 150)];
        let err = DeltaExtractor::new().extract(&samples).unwrap_err();
        assert!(matches!(err, PulseError::Ordering { .. }));
    }

    #[test]
    fn test_duplicate_timestamp_fails_fast() {
        let samples = vec![sample("post:1", 1, 100), sample("post:1", 1, 150)];
        let err = DeltaExtractor::new().extract(&samples).unwrap_err();
        assert!(matches!(err, PulseError::Ordering { .. }));
    }

    #[test]
    fn test_mixed_entities_fail_fast() {
        let samples = vec![sample("post:1", 1, 100), sample("post:2", 2, 150)];
        let err = DeltaExtractor::new().extract(&samples).unwrap_err();
        assert!(matches!(err, PulseError::Ordering { .. }));
    }

    #[test]
    fn test_metric_appearing_mid_series() {
        let mut late = BTreeMap::new();
        late.insert(MetricName::Views, 150);
        late.insert(MetricName::Likes, 12);
        let samples = vec![
            sample("post:1", 0, 100),
            Sample::new("post:1", ts(1), late, BTreeMap::new()).unwrap(),
        ];

        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        // A metric with no prior reading diffs against zero
        assert_eq!(deltas[1].count(MetricName::Likes), 12);
        assert_eq!(deltas[1].count(MetricName::Views), 50);
    }

    #[test]
    fn test_telescoping_sum_for_monotone_series() {
        let samples = vec![
            sample("post:1", 0, 10),
            sample("post:1", 1, 25),
            sample("post:1", 2, 31),
            sample("post:1", 3, 60),
        ];

        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        let sum: u64 = deltas
            .iter()
            .skip(1)
            .map(|d| d.count(MetricName::Views))
            .sum();
        assert_eq!(sum, 60 - 10);
    }
}
