//! Merging per-entity delta series into the shared bucket grid

use crate::types::{Bucket, DeltaPoint, EntityContribution, GridBounds, ReportWindow, TrendReport};
use pulse_common::MetricName;
use tracing::{debug, instrument};

/// Assigns delta points to buckets and sums across entities.
///
/// Per-entity contributions are retained inside each bucket for drill-down;
/// they are ordered by the primary count metric descending so the top
/// contributor of a bucket is well-defined.
#[derive(Debug)]
pub struct BucketMerger {
    primary_metric: MetricName,
}

impl BucketMerger {
    pub fn new(primary_metric: MetricName) -> Self {
        Self { primary_metric }
    }

    /// Merge all series into the grid.
    ///
    /// A delta point whose timestamp matches no bucket is dropped and
    /// counted; the grid is bounded by the max observed timestamp of the
    /// same dataset, so drops only happen for data outside the window.
    #[instrument(skip_all, fields(buckets = grid.len(), series = series.len()))]
    pub fn merge(
        &self,
        mut grid: Vec<Bucket>,
        window: &ReportWindow,
        series: &[Vec<DeltaPoint>],
    ) -> TrendReport {
        let mut dropped_points = 0usize;

        for deltas in series {
            for point in deltas {
                let bucket = window
                    .bucket_index(point.bucket_ts)
                    .and_then(|index| grid.get_mut(index));
                let Some(bucket) = bucket else {
                    dropped_points += 1;
                    continue;
                };
                Self::accumulate(bucket, point);
            }
        }

        for bucket in &mut grid {
            self.finalize_bucket(bucket);
        }

        if dropped_points > 0 {
            debug!(dropped_points, "delta points fell outside the grid");
        }

        let bounds = match (grid.first(), grid.last()) {
            (Some(first), Some(last)) => Some(GridBounds {
                start: first.timestamp,
                end: last.timestamp,
            }),
            _ => None,
        };

        TrendReport {
            buckets: grid,
            bounds,
            dropped_points,
        }
    }

    fn accumulate(bucket: &mut Bucket, point: &DeltaPoint) {
        for (metric, value) in &point.counts {
            *bucket.aggregate.entry(*metric).or_insert(0.0) += *value as f64;
        }
        bucket.contributions.push(EntityContribution {
            entity_id: point.entity_id.clone(),
            counts: point.counts.clone(),
            rates: point.rates.clone(),
        });
    }

    /// Order contributions and derive the bucket-level engagement rate.
    ///
    /// The aggregate rate is interactions over views for the whole bucket,
    /// which is not the average of the per-entity rates.
    fn finalize_bucket(&self, bucket: &mut Bucket) {
        bucket
            .contributions
            .sort_by(|a, b| b.count(self.primary_metric).cmp(&a.count(self.primary_metric)));

        let views = bucket.aggregate_value(MetricName::Views);
        let interactions: f64 = MetricName::INTERACTIONS
            .iter()
            .map(|m| bucket.aggregate_value(*m))
            .sum();
        let rate = if views > 0.0 { interactions / views } else { 0.0 };
        bucket.aggregate.insert(MetricName::EngagementRate, rate);
    }
}
