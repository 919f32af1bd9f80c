//! Snapshot-to-delta conversion, bucket merging and derived statistics
//!
//! The engine turns cumulative metric snapshots into gap-tolerant,
//! calendar-aligned incremental series merged across entities, plus the
//! percentiles, benchmarks, growth rates and heatmaps derived from them.
//! Everything is computed per invocation over in-memory data handed in by
//! the caller.

pub mod benchmark;
pub mod delta;
pub mod grid;
pub mod heatmap;
pub mod merge;
pub mod report;
pub mod settings;
pub mod stats;
pub mod types;

pub use benchmark::BenchmarkCalculator;
pub use delta::DeltaExtractor;
pub use grid::BucketGridBuilder;
pub use heatmap::HeatmapBinner;
pub use merge::BucketMerger;
pub use report::TrendReportBuilder;
pub use settings::{ReportSettings, SettingsError, SettingsLoader};
pub use stats::{benchmark_average, growth_rate, percentile};
pub use types::{
    BenchmarkProfile, Bucket, DeltaPoint, EntityContribution, GridBounds, Heatmap, HeatmapCell,
    ReportWindow, TrendReport, WindowMode,
};
