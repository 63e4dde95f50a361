//! Health snapshot aggregation
//!
//! This module provides the public entry point. One call:
//! 1. Sets up a provider session (configure, optional authenticate, sensors)
//! 2. Issues every biomarker query plus one scores query concurrently
//! 3. Reduces samples per query and hands the readings to the [`Reconciler`]
//!
//! Only session setup can fail the call. Failed or empty queries become empty
//! fields on the returned snapshot.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::AggregatorConfig;
use crate::error::{ProviderError, SnapshotError};
use crate::provider::BiometricProvider;
use crate::query::{BiomarkerQuery, QUERY_PLAN};
use crate::reconcile::{RawReadings, Reconciler, SnapshotReport};
use crate::types::{BiomarkerType, HealthSnapshot, QueryWindow, ScoreType};

/// Aggregates one health snapshot per query window
pub struct HealthSnapshotAggregator<P> {
    provider: P,
    config: AggregatorConfig,
}

impl<P: BiometricProvider> HealthSnapshotAggregator<P> {
    /// Create an aggregator with default configuration (local-sensor-only)
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AggregatorConfig::default())
    }

    pub fn with_config(provider: P, config: AggregatorConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate a snapshot for `[window_start, window_end)`
    ///
    /// # Errors
    /// * `ProviderUnsupportedPlatform` - the provider cannot run here
    /// * `AuthenticationFailed` - configure or authenticate reported failure
    /// * `InvalidWindow` - `window_start` is not before `window_end`
    pub async fn aggregate(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<HealthSnapshot, SnapshotError> {
        let report = self.aggregate_report(window_start, window_end).await?;
        Ok(report.snapshot)
    }

    /// Aggregate a snapshot and keep the per-field diagnostics
    pub async fn aggregate_report(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<SnapshotReport, SnapshotError> {
        let window = QueryWindow::new(window_start, window_end)?;

        self.start_session().await?;

        let readings = self.collect_readings(&window).await;
        let report = Reconciler::reconcile(&readings);

        info!(
            start = %window.start,
            end = %window.end,
            coverage = report.snapshot.coverage(),
            diagnostics = report.diagnostics.len(),
            "health snapshot aggregated"
        );

        Ok(report)
    }

    /// Run every query for the window and collect the raw readings
    pub async fn collect_readings(&self, window: &QueryWindow) -> RawReadings {
        let start_ms = window.start_ms();
        let end_ms = window.end_ms();

        let biomarkers = join_all(
            QUERY_PLAN
                .iter()
                .map(|query| self.run_query(query, start_ms, end_ms)),
        );
        let scores = self.provider.query_scores(&ScoreType::ALL, start_ms, end_ms);

        let (biomarker_results, score_results) = futures::join!(biomarkers, scores);

        let mut readings = RawReadings::default();
        for (biomarker, result) in biomarker_results {
            match result {
                Ok(Some(value)) => {
                    readings.biomarkers.insert(biomarker, value);
                }
                Ok(None) => {}
                Err(e) => {
                    readings.failed_queries.insert(biomarker, e.to_string());
                }
            }
        }

        match score_results {
            Ok(results) => readings.absorb_scores(&results),
            Err(e) => warn!(error = %e, "scores query failed; continuing without scores"),
        }

        readings
    }

    async fn run_query(
        &self,
        query: &BiomarkerQuery,
        start_ms: i64,
        end_ms: i64,
    ) -> (BiomarkerType, Result<Option<f64>, ProviderError>) {
        let result = self
            .provider
            .query_biomarker(query.biomarker, query.category, start_ms, end_ms)
            .await;

        let value = match result {
            Ok(samples) => {
                let value = query.aggregation.reduce(&samples);
                debug!(
                    biomarker = query.biomarker.as_str(),
                    aggregation = query.aggregation.as_str(),
                    samples = samples.len(),
                    value = ?value,
                    "biomarker query resolved"
                );
                Ok(value)
            }
            Err(e) => {
                warn!(biomarker = query.biomarker.as_str(), error = %e, "biomarker query failed");
                Err(e)
            }
        };

        (query.biomarker, value)
    }

    /// Configure, authenticate and enable sensors. Not retried.
    async fn start_session(&self) -> Result<(), SnapshotError> {
        if !self.provider.is_supported() {
            warn!("biometric provider is not supported on this platform");
            return Err(SnapshotError::ProviderUnsupportedPlatform);
        }

        self.provider
            .configure(self.config.environment)
            .await
            .map_err(|e| SnapshotError::AuthenticationFailed(format!("configure: {e}")))?;

        match &self.config.credentials {
            Some(credentials) => {
                self.provider
                    .authenticate(credentials)
                    .await
                    .map_err(|e| SnapshotError::AuthenticationFailed(format!("authenticate: {e}")))?;
                info!(external_id = %credentials.external_id, "provider session authenticated");
            }
            None => debug!("no credentials configured; using local sensors only"),
        }

        if !self.config.sensors.is_empty() {
            if let Err(e) = self.provider.enable_sensors(&self.config.sensors).await {
                warn!(error = %e, "failed to enable sensors; continuing with existing data");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FixtureDocument, FixtureProvider};
    use crate::rules::FIELD_RULES;
    use crate::types::{BiomarkerSample, Credentials, ScoreFactor, ScoreResult};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        (start, start + Duration::days(1))
    }

    fn sample(value: f64, hour: i64) -> BiomarkerSample {
        BiomarkerSample {
            value,
            timestamp: window().0 + Duration::hours(hour),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            app_id: "app".to_string(),
            app_secret: "secret".to_string(),
            external_id: "user-1".to_string(),
        }
    }

    fn document() -> FixtureDocument {
        let mut doc = FixtureDocument::default();
        doc.biomarkers
            .insert(BiomarkerType::Steps, vec![sample(100.0, 1), sample(250.0, 2)]);
        doc.biomarkers
            .insert(BiomarkerType::Weight, vec![sample(71.0, 1), sample(70.4, 20)]);
        doc.biomarkers
            .insert(BiomarkerType::SleepEfficiency, vec![sample(150.0, 6)]);
        doc.biomarkers
            .insert(BiomarkerType::SleepDuration, vec![sample(30000.0, 7)]);
        doc.failing_biomarkers
            .insert(BiomarkerType::Vo2Max, "permission denied".to_string());
        doc.scores = vec![ScoreResult {
            score_type: ScoreType::Readiness,
            score: Some(0.74),
            factors: vec![ScoreFactor {
                name: "resting_heart_rate".to_string(),
                value: Some(62.0),
            }],
        }];
        doc
    }

    #[tokio::test]
    async fn test_aggregate_full_window() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(document()));
        let (start, end) = window();

        let snapshot = aggregator.aggregate(start, end).await.unwrap();

        assert_eq!(snapshot.activity.steps, Some(350.0));
        assert_eq!(snapshot.body.weight, Some(70.4));
        assert_eq!(snapshot.sleep.efficiency, None);
        assert_eq!(snapshot.sleep.duration, Some(30000.0));
        assert_eq!(snapshot.vitals.resting_heart_rate, Some(62.0));
        assert_eq!(snapshot.vitals.vo2_max, None);
        assert_eq!(snapshot.scores.readiness, Some(0.74));
        assert_eq!(snapshot.scores.sleep, None);
    }

    #[tokio::test]
    async fn test_every_query_is_issued_once() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(document()));
        let (start, end) = window();

        aggregator.aggregate(start, end).await.unwrap();

        assert_eq!(aggregator.provider().biomarker_queries(), QUERY_PLAN.len());
        assert_eq!(aggregator.provider().score_queries(), 1);
    }

    #[tokio::test]
    async fn test_report_carries_diagnostics() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(document()));
        let (start, end) = window();

        let report = aggregator.aggregate_report(start, end).await.unwrap();
        let flags = report.flags();

        assert!(flags.contains(&"vo2_max:query_failed".to_string()));
        assert!(flags.contains(&"sleep_efficiency:value_out_of_range".to_string()));
        assert!(flags.contains(&"resting_heart_rate:factor_fallback".to_string()));
    }

    #[tokio::test]
    async fn test_authentication_failure_is_fatal() {
        let mut doc = document();
        doc.authenticate_error = Some("invalid profile token".to_string());
        let config = AggregatorConfig {
            credentials: Some(credentials()),
            ..Default::default()
        };
        let aggregator = HealthSnapshotAggregator::with_config(FixtureProvider::new(doc), config);
        let (start, end) = window();

        let result = aggregator.aggregate(start, end).await;

        assert!(matches!(result, Err(SnapshotError::AuthenticationFailed(_))));
        assert_eq!(aggregator.provider().biomarker_queries(), 0);
        assert_eq!(aggregator.provider().score_queries(), 0);
    }

    #[tokio::test]
    async fn test_local_only_mode_skips_authentication() {
        let mut doc = document();
        doc.authenticate_error = Some("should not be called".to_string());
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(doc));
        let (start, end) = window();

        assert!(aggregator.aggregate(start, end).await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_failure_is_authentication_failed() {
        let mut doc = document();
        doc.configure_error = Some("bad environment".to_string());
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(doc));
        let (start, end) = window();

        let err = aggregator.aggregate(start, end).await.unwrap_err();

        assert!(matches!(err, SnapshotError::AuthenticationFailed(ref m) if m.contains("bad environment")));
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let doc = FixtureDocument {
            supported: false,
            ..document()
        };
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(doc));
        let (start, end) = window();

        let result = aggregator.aggregate(start, end).await;

        assert!(matches!(result, Err(SnapshotError::ProviderUnsupportedPlatform)));
    }

    #[tokio::test]
    async fn test_sensor_failure_is_not_fatal() {
        let mut doc = document();
        doc.sensors_error = Some("sensor permission denied".to_string());
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(doc));
        let (start, end) = window();

        let snapshot = aggregator.aggregate(start, end).await.unwrap();

        assert_eq!(snapshot.activity.steps, Some(350.0));
    }

    #[tokio::test]
    async fn test_scores_failure_degrades_to_no_scores() {
        let mut doc = document();
        doc.scores_error = Some("scores unavailable".to_string());
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(doc));
        let (start, end) = window();

        let snapshot = aggregator.aggregate(start, end).await.unwrap();

        assert_eq!(snapshot.scores.readiness, None);
        assert_eq!(snapshot.vitals.resting_heart_rate, None);
        assert_eq!(snapshot.activity.steps, Some(350.0));
    }

    #[tokio::test]
    async fn test_invalid_window_rejected_before_setup() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(document()));
        let (start, end) = window();

        let result = aggregator.aggregate(end, start).await;

        assert!(matches!(result, Err(SnapshotError::InvalidWindow { .. })));
        assert_eq!(aggregator.provider().biomarker_queries(), 0);
    }

    #[tokio::test]
    async fn test_empty_provider_yields_empty_snapshot() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::default());
        let (start, end) = window();

        let report = aggregator.aggregate_report(start, end).await.unwrap();

        assert_eq!(report.snapshot, HealthSnapshot::default());
        assert_eq!(report.snapshot.coverage(), 0.0);
        assert_eq!(report.diagnostics.len(), FIELD_RULES.len());
    }

    #[tokio::test]
    async fn test_snapshot_depends_only_on_window_data() {
        let aggregator = HealthSnapshotAggregator::new(FixtureProvider::new(document()));
        let (start, end) = window();

        let first = aggregator.aggregate(start, end).await.unwrap();
        let next_day = aggregator
            .aggregate(end, end + Duration::days(1))
            .await
            .unwrap();
        let again = aggregator.aggregate(start, end).await.unwrap();

        assert_eq!(next_day.activity.steps, None);
        assert_eq!(first, again);
    }
}
