//! Day-by-hour activity binning

use crate::types::{DeltaPoint, Heatmap};
use chrono::{Datelike, FixedOffset, Timelike};
use pulse_common::{MetricName, PulseError, Result};
use tracing::instrument;

/// Bins delta points into a 7x24 day-of-week by hour-of-day grid.
///
/// Timestamps are shifted into the dashboard's local timezone before
/// binning; the offset is explicit configuration, never read from the
/// environment.
#[derive(Debug)]
pub struct HeatmapBinner {
    offset: FixedOffset,
}

impl HeatmapBinner {
    /// Offsets are minutes east of UTC, within the real-world +/-14h range.
    pub fn new(utc_offset_minutes: i32) -> Result<Self> {
        if utc_offset_minutes.abs() > 14 * 60 {
            return Err(PulseError::validation_field(
                format!("UTC offset of {} minutes is out of range", utc_offset_minutes),
                "utc_offset_minutes",
            ));
        }
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            PulseError::validation_field(
                format!("UTC offset of {} minutes is out of range", utc_offset_minutes),
                "utc_offset_minutes",
            )
        })?;
        Ok(Self { offset })
    }

    /// Accumulate each point's `metric` delta into its local-time slot.
    ///
    /// Every point increments the slot count even when its delta is zero;
    /// an observed-but-quiet hour must stay distinguishable from an hour
    /// with no observations at all.
    #[instrument(skip(self, points), fields(points = points.len(), metric = %metric))]
    pub fn bin(&self, points: &[DeltaPoint], metric: MetricName) -> Heatmap {
        let mut heatmap = Heatmap::new();

        for point in points {
            let local = point.bucket_ts.with_timezone(&self.offset);
            let day = local.weekday().num_days_from_monday() as u8;
            let hour = local.hour() as u8;

            let cell = heatmap.cell_mut(day, hour);
            cell.count += 1;
            cell.value_sum += point.count(metric) as f64;
        }

        heatmap
    }
}
