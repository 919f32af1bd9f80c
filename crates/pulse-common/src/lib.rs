//! Common utilities and types for the pulse aggregation engine

pub mod api;
pub mod error;
pub mod logging;
pub mod source;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use api::{ApiEnvelope, SnapshotApiClient, SnapshotApiConfig, SnapshotRow};
pub use error::{PulseError, Result};
pub use logging::{init_default_logging, init_dev_logging, init_logging, init_prod_logging, LoggingConfig};
pub use source::{Granularity, SampleSource};
pub use types::{EntityId, MetricKind, MetricName, Sample, Timestamp};

#[cfg(feature = "testing")]
pub use source::MockSampleSource;
