//! Report orchestration: fetch fan-out and the public computation surface

use crate::benchmark::BenchmarkCalculator;
use crate::delta::DeltaExtractor;
use crate::grid::BucketGridBuilder;
use crate::heatmap::HeatmapBinner;
use crate::merge::BucketMerger;
use crate::settings::ReportSettings;
use crate::types::{BenchmarkProfile, DeltaPoint, Heatmap, ReportWindow, TrendReport};
use futures::future;
use pulse_common::{utils, EntityId, MetricName, Result, Sample, SampleSource};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Entry point for report computations.
///
/// One builder is constructed per report context from explicit settings;
/// each call owns all of its intermediate state, so concurrent report
/// invocations never share anything mutable.
#[derive(Debug, Clone)]
pub struct TrendReportBuilder {
    settings: ReportSettings,
}

impl TrendReportBuilder {
    pub fn new(settings: ReportSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn with_defaults() -> Self {
        Self {
            settings: ReportSettings::default(),
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Compute the merged trend series for a set of entities.
    ///
    /// Per-entity history fetches are issued concurrently and awaited
    /// jointly; aggregation itself runs synchronously once the full
    /// dataset is in memory. Dropping the returned future abandons the
    /// whole computation.
    #[instrument(skip_all, fields(entities = entity_ids.len()))]
    pub async fn compute_trend<S>(
        &self,
        source: &S,
        entity_ids: &[EntityId],
        window: &ReportWindow,
    ) -> Result<TrendReport>
    where
        S: SampleSource + ?Sized,
    {
        let report_id = utils::new_report_id();
        info!(%report_id, "computing trend report");

        let fetches = entity_ids.iter().map(|id| {
            source.fetch_samples(std::slice::from_ref(id), window.granularity(), window.start)
        });
        let per_entity: Vec<Vec<Sample>> = future::try_join_all(fetches).await?;

        let max_observed = per_entity
            .iter()
            .flatten()
            .map(|sample| sample.bucket_ts)
            .max();

        let extractor = DeltaExtractor::new();
        let mut series = Vec::with_capacity(per_entity.len());
        for samples in &per_entity {
            series.push(extractor.extract(samples)?);
        }

        let grid = BucketGridBuilder::new().build(window, max_observed);
        let report =
            BucketMerger::new(self.settings.primary_metric).merge(grid, window, &series);

        info!(
            %report_id,
            buckets = report.buckets.len(),
            dropped = report.dropped_points,
            "trend report complete"
        );
        Ok(report)
    }

    /// Compute the long-run benchmark for one entity and metric.
    ///
    /// `Ok(None)` means the benchmark is unavailable, which callers must
    /// render as absent rather than as a zero comparison.
    #[instrument(skip(self, source), fields(entity_id = %entity_id, metric = %metric))]
    pub async fn compute_benchmark<S>(
        &self,
        source: &S,
        entity_id: &EntityId,
        metric: MetricName,
    ) -> Result<Option<BenchmarkProfile>>
    where
        S: SampleSource + ?Sized,
    {
        let samples = source.fetch_all_time_samples(entity_id).await?;
        BenchmarkCalculator::new(self.settings.min_benchmark_samples).compute(&samples, metric)
    }

    /// Bin snapshot activity into the day-by-hour heatmap.
    ///
    /// Samples may interleave entities but must be time-ordered within
    /// each entity; each entity's series goes through delta extraction
    /// before binning so the heatmap reflects increments, not cumulative
    /// totals.
    #[instrument(skip(self, samples), fields(samples = samples.len()))]
    pub fn compute_heatmap(&self, samples: &[Sample]) -> Result<Heatmap> {
        let mut by_entity: BTreeMap<EntityId, Vec<Sample>> = BTreeMap::new();
        for sample in samples {
            by_entity
                .entry(sample.entity_id.clone())
                .or_default()
                .push(sample.clone());
        }

        let extractor = DeltaExtractor::new();
        let mut points: Vec<DeltaPoint> = Vec::with_capacity(samples.len());
        for series in by_entity.values() {
            points.extend(extractor.extract(series)?);
        }

        debug!(entities = by_entity.len(), "binning heatmap activity");
        let binner = HeatmapBinner::new(self.settings.utc_offset_minutes)?;
        Ok(binner.bin(&points, self.settings.primary_metric))
    }
}

impl Default for TrendReportBuilder {
    fn default() -> Self {
        Self::with_defaults()
    }
}
