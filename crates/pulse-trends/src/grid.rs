//! Bucket grid construction for reporting windows

use crate::types::{Bucket, ReportWindow};
use pulse_common::Timestamp;
use tracing::{debug, instrument};

/// Builds the ordered list of empty buckets a report will be merged into.
///
/// The grid is calendar-aligned at the front and bounded by the latest
/// observed sample at the back, so a report never renders a flat-zero tail
/// for time that simply has not been measured yet.
#[derive(Debug, Default)]
pub struct BucketGridBuilder;

impl BucketGridBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Produce buckets from the window start through the bucket containing
    /// `max_observed`, never beyond it.
    ///
    /// With no observed samples the grid is empty; callers surface that as
    /// a distinct "no data" state rather than a zero-filled series.
    #[instrument(skip(self, window))]
    pub fn build(&self, window: &ReportWindow, max_observed: Option<Timestamp>) -> Vec<Bucket> {
        let Some(max_observed) = max_observed else {
            debug!("no observed samples, grid is empty");
            return Vec::new();
        };

        let mut buckets = Vec::new();
        for index in 0..window.max_buckets() {
            let start = window.bucket_start(index);
            if start > max_observed {
                break;
            }
            buckets.push(Bucket::empty(start, window.bucket_label(start)));
        }

        debug!(buckets = buckets.len(), "built bucket grid");
        buckets
    }
}
