//! Trend series types and report windows

use chrono::{Datelike, Duration, Timelike, Weekday};
use pulse_common::{EntityId, Granularity, MetricName, PulseError, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape of a reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowMode {
    /// Seven days of hour buckets, starting Sunday 00:00
    Week,
    /// A run of day buckets from an arbitrary midnight start
    Month { days: u32 },
}

/// Calendar-aligned reporting window.
///
/// Construct through [`ReportWindow::week`] or [`ReportWindow::month`];
/// both validate alignment instead of silently shifting the start, since a
/// misaligned start usually means a caller bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: Timestamp,
    pub mode: WindowMode,
}

impl ReportWindow {
    /// Week view: hour buckets across seven days starting Sunday midnight UTC
    pub fn week(start: Timestamp) -> Result<Self> {
        if start.weekday() != Weekday::Sun {
            return Err(PulseError::validation_field(
                "week windows must start on a Sunday",
                "start",
            ));
        }
        Self::require_midnight(start)?;
        Ok(Self {
            start,
            mode: WindowMode::Week,
        })
    }

    /// Month view: day buckets from any midnight start
    pub fn month(start: Timestamp, days: u32) -> Result<Self> {
        if days == 0 || days > 366 {
            return Err(PulseError::validation_field(
                format!("month window length of {} days is out of range", days),
                "days",
            ));
        }
        Self::require_midnight(start)?;
        Ok(Self {
            start,
            mode: WindowMode::Month { days },
        })
    }

    fn require_midnight(start: Timestamp) -> Result<()> {
        if (start.hour(), start.minute(), start.second()) != (0, 0, 0) {
            return Err(PulseError::validation_field(
                "window start must be aligned to midnight",
                "start",
            ));
        }
        Ok(())
    }

    pub fn granularity(&self) -> Granularity {
        match self.mode {
            WindowMode::Week => Granularity::Hour,
            WindowMode::Month { .. } => Granularity::Day,
        }
    }

    /// Number of buckets a fully-covered window would hold
    pub fn max_buckets(&self) -> usize {
        match self.mode {
            WindowMode::Week => 7 * 24,
            WindowMode::Month { days } => days as usize,
        }
    }

    /// Exclusive end of the window
    pub fn end(&self) -> Timestamp {
        self.start + self.step() * self.max_buckets() as i32
    }

    fn step(&self) -> Duration {
        match self.granularity() {
            Granularity::Hour => Duration::hours(1),
            Granularity::Day => Duration::days(1),
        }
    }

    /// Start timestamp of the bucket at `index`
    pub fn bucket_start(&self, index: usize) -> Timestamp {
        self.start + self.step() * index as i32
    }

    /// Bucket index for a timestamp, or `None` when it falls outside the
    /// window entirely
    pub fn bucket_index(&self, ts: Timestamp) -> Option<usize> {
        if ts < self.start || ts >= self.end() {
            return None;
        }
        let elapsed = ts - self.start;
        let index = match self.granularity() {
            Granularity::Hour => elapsed.num_hours(),
            Granularity::Day => elapsed.num_days(),
        };
        Some(index as usize)
    }

    /// Axis label for the bucket starting at `ts`.
    ///
    /// Week mode marks day changes: the hour-zero bucket carries the date so
    /// hourly ticks do not repeat it.
    pub fn bucket_label(&self, ts: Timestamp) -> String {
        match self.mode {
            WindowMode::Week => {
                if ts.hour() == 0 {
                    ts.format("%a %m-%d").to_string()
                } else {
                    ts.format("%H:00").to_string()
                }
            }
            WindowMode::Month { .. } => ts.format("%m-%d").to_string(),
        }
    }
}

/// Non-negative increment between two consecutive snapshots of one entity.
///
/// Rate metrics carry the later snapshot's raw value rather than a
/// difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaPoint {
    pub entity_id: EntityId,
    pub bucket_ts: Timestamp,
    pub counts: BTreeMap<MetricName, u64>,
    pub rates: BTreeMap<MetricName, f64>,
}

impl DeltaPoint {
    /// Look up a count delta, treating absence as zero
    pub fn count(&self, metric: MetricName) -> u64 {
        self.counts.get(&metric).copied().unwrap_or(0)
    }
}

/// Per-entity share of one bucket, retained for drill-down tooltips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContribution {
    pub entity_id: EntityId,
    pub counts: BTreeMap<MetricName, u64>,
    pub rates: BTreeMap<MetricName, f64>,
}

impl EntityContribution {
    pub fn count(&self, metric: MetricName) -> u64 {
        self.counts.get(&metric).copied().unwrap_or(0)
    }
}

/// One time slot of the merged trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub timestamp: Timestamp,
    pub label: String,
    pub contributions: Vec<EntityContribution>,
    pub aggregate: BTreeMap<MetricName, f64>,
}

impl Bucket {
    pub fn empty(timestamp: Timestamp, label: String) -> Self {
        Self {
            timestamp,
            label,
            contributions: Vec::new(),
            aggregate: BTreeMap::new(),
        }
    }

    /// Look up an aggregate value, treating absence as zero
    pub fn aggregate_value(&self, metric: MetricName) -> f64 {
        self.aggregate.get(&metric).copied().unwrap_or(0.0)
    }
}

/// First and last bucket timestamps of a produced grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Merged trend series for one report invocation.
///
/// An empty `buckets` list with `None` bounds means no data was observed at
/// all, which callers must render differently from a series of zero-valued
/// buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub buckets: Vec<Bucket>,
    pub bounds: Option<GridBounds>,
    /// Delta points that fell outside every bucket and were discarded
    pub dropped_points: usize,
}

impl TrendReport {
    /// No samples were observed for the requested window
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Long-run average rates used as a comparison baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkProfile {
    pub metric: MetricName,
    pub avg_per_week: f64,
    pub avg_per_month: f64,
    pub sample_count: usize,
    pub elapsed_days: f64,
}

/// Activity aggregate for one day-of-week and hour-of-day slot.
///
/// Days are numbered from Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub day_of_week: u8,
    pub hour_of_day: u8,
    pub count: u64,
    pub value_sum: f64,
}

/// Full 7x24 day-by-hour activity grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    cells: Vec<HeatmapCell>,
}

impl Heatmap {
    pub const DAYS: usize = 7;
    pub const HOURS: usize = 24;

    pub fn new() -> Self {
        let mut cells = Vec::with_capacity(Self::DAYS * Self::HOURS);
        for day in 0..Self::DAYS {
            for hour in 0..Self::HOURS {
                cells.push(HeatmapCell {
                    day_of_week: day as u8,
                    hour_of_day: hour as u8,
                    count: 0,
                    value_sum: 0.0,
                });
            }
        }
        Self { cells }
    }

    pub fn cell(&self, day_of_week: u8, hour_of_day: u8) -> &HeatmapCell {
        &self.cells[Self::index(day_of_week, hour_of_day)]
    }

    pub(crate) fn cell_mut(&mut self, day_of_week: u8, hour_of_day: u8) -> &mut HeatmapCell {
        &mut self.cells[Self::index(day_of_week, hour_of_day)]
    }

    fn index(day_of_week: u8, hour_of_day: u8) -> usize {
        debug_assert!(day_of_week < 7 && hour_of_day < 24);
        day_of_week as usize * Self::HOURS + hour_of_day as usize
    }

    pub fn cells(&self) -> &[HeatmapCell] {
        &self.cells
    }

    /// Largest value sum across all cells
    pub fn max_value(&self) -> f64 {
        self.cells
            .iter()
            .map(|c| c.value_sum)
            .fold(0.0, f64::max)
    }

    /// Color intensity for a cell on a 0.0..=1.0 scale.
    ///
    /// `None` is the no-data sentinel: the slot was never observed, which is
    /// not the same as `Some(0.0)` for observed-but-zero activity.
    pub fn intensity(&self, day_of_week: u8, hour_of_day: u8) -> Option<f64> {
        let cell = self.cell(day_of_week, hour_of_day);
        if cell.count == 0 {
            return None;
        }
        let max = self.max_value();
        if max > 0.0 {
            Some(cell.value_sum / max)
        } else {
            Some(0.0)
        }
    }
}

impl Default for Heatmap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sunday() -> Timestamp {
        // 2026-03-01 is a Sunday
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_week_window_requires_sunday_midnight() {
        assert!(ReportWindow::week(sunday()).is_ok());

        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        assert!(ReportWindow::week(monday).is_err());

        let sunday_noon = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(ReportWindow::week(sunday_noon).is_err());
    }

    #[test]
    fn test_month_window_validation() {
        let start = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        assert!(ReportWindow::month(start, 30).is_ok());
        assert!(ReportWindow::month(start, 0).is_err());
        assert!(ReportWindow::month(start, 400).is_err());

        let not_midnight = Utc.with_ymd_and_hms(2026, 3, 15, 1, 0, 0).unwrap();
        assert!(ReportWindow::month(not_midnight, 30).is_err());
    }

    #[test]
    fn test_bucket_index_week() {
        let window = ReportWindow::week(sunday()).unwrap();

        assert_eq!(window.bucket_index(sunday()), Some(0));

        let tue_14 = Utc.with_ymd_and_hms(2026, 3, 3, 14, 30, 0).unwrap();
        assert_eq!(window.bucket_index(tue_14), Some(2 * 24 + 14));

        let before = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        assert_eq!(window.bucket_index(before), None);

        // Exclusive end: the following Sunday is outside
        assert_eq!(window.bucket_index(window.end()), None);
    }

    #[test]
    fn test_bucket_index_month() {
        let start = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        let window = ReportWindow::month(start, 30).unwrap();

        let mid = Utc.with_ymd_and_hms(2026, 3, 20, 18, 0, 0).unwrap();
        assert_eq!(window.bucket_index(mid), Some(5));
        assert_eq!(window.max_buckets(), 30);
    }

    #[test]
    fn test_week_labels_mark_day_changes() {
        let window = ReportWindow::week(sunday()).unwrap();

        let midnight = window.bucket_start(0);
        assert_eq!(window.bucket_label(midnight), "Sun 03-01");

        let afternoon = window.bucket_start(14);
        assert_eq!(window.bucket_label(afternoon), "14:00");

        let monday_midnight = window.bucket_start(24);
        assert_eq!(window.bucket_label(monday_midnight), "Mon 03-02");
    }

    #[test]
    fn test_heatmap_intensity_sentinel() {
        let mut heatmap = Heatmap::new();
        assert_eq!(heatmap.intensity(0, 0), None);

        {
            let cell = heatmap.cell_mut(0, 0);
            cell.count = 3;
            cell.value_sum = 30.0;
        }
        {
            let cell = heatmap.cell_mut(1, 12);
            cell.count = 1;
            cell.value_sum = 60.0;
        }

        assert_eq!(heatmap.intensity(0, 0), Some(0.5));
        assert_eq!(heatmap.intensity(1, 12), Some(1.0));
        // Observed slot with zero total activity is not the sentinel
        let cell = heatmap.cell_mut(2, 2);
        cell.count = 2;
        cell.value_sum = 0.0;
        assert_eq!(heatmap.intensity(2, 2), Some(0.0));
        // Untouched slot still reads as no data
        assert_eq!(heatmap.intensity(6, 23), None);
    }
}
