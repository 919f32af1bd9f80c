//! Snapshot API client with connection pooling and rate limiting
//!
//! HTTP implementation of [`SampleSource`] against the dashboard's snapshot
//! store, including authentication, rate limiting, retry logic and row
//! normalization. Rows come back sorted and deduplicated so the aggregation
//! core's ordering precondition holds.

use crate::error::{PulseError, Result};
use crate::source::{Granularity, SampleSource};
use crate::types::{EntityId, MetricKind, MetricName, Sample, Timestamp};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Configuration for the snapshot API client
#[derive(Debug, Clone)]
pub struct SnapshotApiConfig {
    /// Base URL of the snapshot store (e.g., "http://localhost:8600")
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Connection pool max idle connections per host (default: 10)
    pub max_idle_per_host: usize,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u32,
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: usize,
}

impl Default for SnapshotApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8600".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_idle_per_host: 10,
            rate_limit_per_sec: 10,
            max_retries: 3,
        }
    }
}

impl SnapshotApiConfig {
    /// Create a new configuration with the minimum required parameters
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the rate limit
    pub fn with_rate_limit(mut self, rate_limit_per_sec: u32) -> Self {
        self.rate_limit_per_sec = rate_limit_per_sec;
        self
    }

    /// Set the maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Response envelope returned by every snapshot store endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "ok"
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error_message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Raw snapshot row as stored by the collection pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRow {
    pub entity_id: String,
    pub bucket_ts: Timestamp,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl SnapshotRow {
    /// Normalize a raw row into a typed [`Sample`].
    ///
    /// Unrecognized metric keys are dropped with a warning; malformed values
    /// for recognized keys are dropped the same way. Ingestion never fails a
    /// whole fetch over a single bad cell.
    fn into_sample(self) -> Result<Sample> {
        let mut counts = BTreeMap::new();
        let mut rates = BTreeMap::new();

        for (key, value) in self.metrics {
            let Some(metric) = MetricName::from_key(&key) else {
                warn!(entity_id = %self.entity_id, key = %key, "dropping unrecognized metric key");
                continue;
            };
            match metric.kind() {
                MetricKind::Count => match value.as_u64() {
                    Some(count) => {
                        counts.insert(metric, count);
                    }
                    None => {
                        warn!(
                            entity_id = %self.entity_id,
                            metric = %metric,
                            ?value,
                            "dropping non-integer count value"
                        );
                    }
                },
                MetricKind::Rate => match value.as_f64() {
                    Some(rate) => {
                        rates.insert(metric, rate);
                    }
                    None => {
                        warn!(
                            entity_id = %self.entity_id,
                            metric = %metric,
                            ?value,
                            "dropping non-numeric rate value"
                        );
                    }
                },
            }
        }

        Sample::new(self.entity_id, self.bucket_ts, counts, rates)
    }
}

/// Snapshot API client with connection pooling and rate limiting
#[derive(Debug, Clone)]
pub struct SnapshotApiClient {
    client: Client,
    config: SnapshotApiConfig,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl SnapshotApiClient {
    /// Create a new snapshot client with the given configuration
    pub fn new(config: SnapshotApiConfig) -> Result<Self> {
        Url::parse(&config.base_url)
            .map_err(|e| PulseError::config_with_source("Invalid snapshot API base URL", e))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| PulseError::network_with_source("Failed to create HTTP client", e))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limit_per_sec)
                .ok_or_else(|| PulseError::config("Rate limit must be greater than 0"))?,
        );
        let rate_limiter = Arc::new(DefaultDirectRateLimiter::direct(quota));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Create a new client with default configuration
    pub fn with_defaults(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let config = SnapshotApiConfig::new(base_url, api_key);
        Self::new(config)
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Make an authenticated request with retry logic.
    ///
    /// Timeouts, connection failures and 5xx responses are retried with
    /// exponential backoff; 4xx responses are not.
    #[instrument(skip(self, params), fields(endpoint = %endpoint))]
    async fn make_request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let url = self.build_url(endpoint);
        debug!("Making request to: {}", url);

        let mut query_params: Vec<(&str, String)> =
            vec![("api_key", self.config.api_key.clone())];
        query_params.extend_from_slice(params);

        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(10))
            .take(self.config.max_retries);

        let response = RetryIf::spawn(
            retry_strategy,
            || async {
                let request = self.client.get(&url).query(&query_params);

                match request.send().await {
                    Ok(response) => {
                        if response.status().is_success() {
                            debug!("Request successful: {}", response.status());
                            Ok(response)
                        } else if response.status().is_client_error() {
                            error!("Client error: {}", response.status());
                            Err(PulseError::api_with_status(
                                format!("API returned client error: {}", response.status()),
                                response.status().as_u16(),
                            ))
                        } else {
                            warn!("Server error, will retry: {}", response.status());
                            Err(PulseError::api_with_status(
                                format!("API returned server error: {}", response.status()),
                                response.status().as_u16(),
                            ))
                        }
                    }
                    Err(e) if e.is_timeout() => {
                        warn!("Request timeout, will retry: {}", e);
                        Err(PulseError::network_with_source("Request timeout", e))
                    }
                    Err(e) if e.is_connect() => {
                        warn!("Connection error, will retry: {}", e);
                        Err(PulseError::network_with_source("Connection error", e))
                    }
                    Err(e) => {
                        error!("Request failed: {}", e);
                        Err(PulseError::network_with_source("Request failed", e))
                    }
                }
            },
            PulseError::is_retryable,
        )
        .await?;

        info!("Successfully completed request to {}", endpoint);
        Ok(response)
    }

    /// Make a request and parse the enveloped JSON response
    async fn request_rows(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<SnapshotRow>> {
        let response = self.make_request(endpoint, params).await?;
        let text = response
            .text()
            .await
            .map_err(|e| PulseError::network_with_source("Failed to read response body", e))?;

        let envelope: ApiEnvelope<Vec<SnapshotRow>> = serde_json::from_str(&text)?;

        if envelope.is_success() {
            envelope
                .into_data()
                .ok_or_else(|| PulseError::api("Snapshot response contained no data"))
        } else {
            Err(PulseError::api(
                envelope
                    .error_message()
                    .unwrap_or("Unknown error fetching snapshots"),
            ))
        }
    }

    /// Normalize raw rows: typed samples, sorted by entity and timestamp,
    /// duplicate `(entity, bucket_ts)` rows collapsed last-write-wins.
    fn normalize(&self, rows: Vec<SnapshotRow>) -> Result<Vec<Sample>> {
        let mut by_key: BTreeMap<(EntityId, Timestamp), Sample> = BTreeMap::new();
        let raw_len = rows.len();

        for row in rows {
            let sample = row.into_sample()?;
            by_key.insert((sample.entity_id.clone(), sample.bucket_ts), sample);
        }

        if by_key.len() < raw_len {
            debug!(
                dropped = raw_len - by_key.len(),
                "collapsed duplicate snapshot rows"
            );
        }

        Ok(by_key.into_values().collect())
    }
}

#[async_trait]
impl SampleSource for SnapshotApiClient {
    #[instrument(skip(self, entity_ids), fields(entities = entity_ids.len(), granularity = granularity.as_str()))]
    async fn fetch_samples(
        &self,
        entity_ids: &[EntityId],
        granularity: Granularity,
        since: Timestamp,
    ) -> Result<Vec<Sample>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        info!("Fetching snapshot history");
        let params = [
            ("entity_ids", entity_ids.join(",")),
            ("granularity", granularity.as_str().to_string()),
            ("since", since.to_rfc3339()),
        ];
        let rows = self.request_rows("snapshots", &params).await?;
        self.normalize(rows)
    }

    #[instrument(skip(self), fields(entity_id = %entity_id))]
    async fn fetch_all_time_samples(&self, entity_id: &EntityId) -> Result<Vec<Sample>> {
        info!("Fetching all-time snapshot history");
        let params = [("entity_id", entity_id.clone())];
        let rows = self.request_rows("snapshots/all", &params).await?;
        self.normalize(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(entity: &str, ts: Timestamp, metrics: &[(&str, serde_json::Value)]) -> SnapshotRow {
        SnapshotRow {
            entity_id: entity.to_string(),
            bucket_ts: ts,
            metrics: metrics
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn ts(hour: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_row_conversion_splits_kinds() {
        let sample = row(
            "post:1",
            ts(12),
            &[
                ("views", serde_json::json!(100)),
                ("likes", serde_json::json!(7)),
                ("engagement_rate", serde_json::json!(0.07)),
            ],
        )
        .into_sample()
        .unwrap();

        assert_eq!(sample.count(MetricName::Views), 100);
        assert_eq!(sample.count(MetricName::Likes), 7);
        assert_eq!(sample.rates.get(&MetricName::EngagementRate), Some(&0.07));
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let sample = row(
            "post:1",
            ts(12),
            &[
                ("views", serde_json::json!(100)),
                ("bookmark_count", serde_json::json!(12)),
            ],
        )
        .into_sample()
        .unwrap();

        assert_eq!(sample.counts.len(), 1);
        assert_eq!(sample.count(MetricName::Views), 100);
    }

    #[test]
    fn test_malformed_values_are_dropped() {
        let sample = row(
            "post:1",
            ts(12),
            &[
                ("views", serde_json::json!("not a number")),
                ("likes", serde_json::json!(-3)),
                ("replies", serde_json::json!(2)),
            ],
        )
        .into_sample()
        .unwrap();

        // Negative integers fail the u64 read and are dropped like strings
        assert_eq!(sample.counts.len(), 1);
        assert_eq!(sample.count(MetricName::Replies), 2);
    }

    #[test]
    fn test_normalize_sorts_and_dedupes_last_wins() {
        let client = SnapshotApiClient::with_defaults("http://localhost:8600", "key").unwrap();
        let rows = vec![
            row("post:2", ts(13), &[("views", serde_json::json!(5))]),
            row("post:1", ts(14), &[("views", serde_json::json!(20))]),
            row("post:1", ts(12), &[("views", serde_json::json!(10))]),
            // Duplicate timestamp for post:1; the later row wins
            row("post:1", ts(12), &[("views", serde_json::json!(11))]),
        ];

        let samples = client.normalize(rows).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].entity_id, "post:1");
        assert_eq!(samples[0].bucket_ts, ts(12));
        assert_eq!(samples[0].count(MetricName::Views), 11);
        assert_eq!(samples[1].bucket_ts, ts(14));
        assert_eq!(samples[2].entity_id, "post:2");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = SnapshotApiClient::with_defaults("not a url", "key");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = SnapshotApiConfig::new("http://localhost:8600", "key").with_rate_limit(0);
        assert!(SnapshotApiClient::new(config).is_err());
    }
}
