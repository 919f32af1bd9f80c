//! Algebraic properties of the aggregation primitives

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use pulse_common::{MetricName, Sample, Timestamp};
use pulse_trends::{percentile, BucketGridBuilder, DeltaExtractor, ReportWindow};
use std::collections::BTreeMap;

fn base_ts() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

fn series_from_values(values: &[u64]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, views)| {
            let mut counts = BTreeMap::new();
            counts.insert(MetricName::Views, *views);
            Sample::new(
                "post:1",
                base_ts() + Duration::hours(i as i64),
                counts,
                BTreeMap::new(),
            )
            .unwrap()
        })
        .collect()
}

proptest! {
    /// For a non-decreasing series the deltas telescope: their sum
    /// (excluding the cold-start point) is last minus first.
    #[test]
    fn telescoping_sum(increments in prop::collection::vec(0u64..1_000, 1..50)) {
        let mut values = Vec::with_capacity(increments.len());
        let mut acc = 0u64;
        for inc in &increments {
            acc += inc;
            values.push(acc);
        }

        let samples = series_from_values(&values);
        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        let sum: u64 = deltas.iter().skip(1).map(|d| d.count(MetricName::Views)).sum();
        prop_assert_eq!(sum, values[values.len() - 1] - values[0]);
    }

    /// Deltas never go negative, whatever the input series does.
    #[test]
    fn deltas_are_non_negative(values in prop::collection::vec(0u64..10_000, 1..50)) {
        let samples = series_from_values(&values);
        let deltas = DeltaExtractor::new().extract(&samples).unwrap();

        // u64 cannot be negative; the meaningful check is that extraction
        // tolerates arbitrary corrections without failing
        prop_assert_eq!(deltas.len(), values.len());
    }

    /// Nearest-rank endpoints: p100 is the max, p0 the min, and every
    /// percentile is an element of the input.
    #[test]
    fn percentile_endpoints(values in prop::collection::vec(-1_000.0f64..1_000.0, 1..60), p in 0.0f64..=100.0) {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);

        prop_assert_eq!(percentile(&values, 100.0), Some(max));
        prop_assert_eq!(percentile(&values, 0.0), Some(min));

        let pick = percentile(&values, p).unwrap();
        prop_assert!(values.contains(&pick));
        prop_assert!(pick >= min && pick <= max);
    }

    /// The grid never fabricates a bucket past the latest observation, for
    /// any observation inside the window.
    #[test]
    fn grid_bounded_by_max_observed(offset_hours in 0i64..(7 * 24)) {
        let window = ReportWindow::week(base_ts()).unwrap();
        let max_observed = base_ts() + Duration::hours(offset_hours) + Duration::minutes(17);

        let grid = BucketGridBuilder::new().build(&window, Some(max_observed));

        prop_assert!(!grid.is_empty());
        prop_assert!(grid.iter().all(|b| b.timestamp <= max_observed));
        prop_assert_eq!(grid.len(), offset_hours as usize + 1);
    }
}
