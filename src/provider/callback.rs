//! Bridge for callback-style biometrics SDKs
//!
//! Native mobile SDKs report results through completion callbacks:
//! `(error, success)` for setup calls and `(error, json)` for queries.
//! [`CallbackBridge`] turns each call into a future with a oneshot channel so
//! the aggregator only ever sees `async fn -> Result`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use serde::Deserialize;
use tracing::debug;

use super::BiometricProvider;
use crate::error::ProviderError;
use crate::types::{
    BiomarkerCategory, BiomarkerSample, BiomarkerType, Credentials, Environment, ScoreResult,
    ScoreType, Sensor,
};

/// Completion callback for setup calls: `(error message, success)`
pub type SetupCallback = Box<dyn FnOnce(Option<String>, bool) + Send + 'static>;

/// Completion callback for queries: `(error message, JSON payload)`
pub type QueryCallback = Box<dyn FnOnce(Option<String>, Option<String>) + Send + 'static>;

/// Callback convention exposed by a native biometrics SDK
pub trait CallbackSdk: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }

    fn configure(&self, environment: Environment, callback: SetupCallback);

    fn authenticate(&self, app_id: &str, app_secret: &str, external_id: &str, callback: SetupCallback);

    fn enable_sensors(&self, sensors: &[Sensor], callback: SetupCallback);

    /// Payload: JSON array of `{value, endDateTime}` objects
    fn get_biomarkers(
        &self,
        category: &str,
        biomarker: &str,
        start_ms: i64,
        end_ms: i64,
        callback: QueryCallback,
    );

    /// Payload: JSON array of `{type, score, factors: [{name, value}]}` objects
    fn get_scores(&self, score_types: &[&str], start_ms: i64, end_ms: i64, callback: QueryCallback);
}

/// Adapts a [`CallbackSdk`] to [`BiometricProvider`]
pub struct CallbackBridge<S> {
    sdk: S,
}

impl<S: CallbackSdk> CallbackBridge<S> {
    pub fn new(sdk: S) -> Self {
        Self { sdk }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }
}

fn setup_channel(
    operation: &'static str,
) -> (SetupCallback, oneshot::Receiver<Result<(), ProviderError>>) {
    let (tx, rx) = oneshot::channel();
    let callback: SetupCallback = Box::new(move |error, success| {
        let result = match (error, success) {
            (Some(message), _) => Err(ProviderError::Sdk(message)),
            (None, true) => Ok(()),
            (None, false) => Err(ProviderError::Unsuccessful(operation)),
        };
        // Receiver may be gone if the caller stopped waiting
        let _ = tx.send(result);
    });
    (callback, rx)
}

fn query_channel() -> (QueryCallback, oneshot::Receiver<Result<String, ProviderError>>) {
    let (tx, rx) = oneshot::channel();
    let callback: QueryCallback = Box::new(move |error, payload| {
        let result = match (error, payload) {
            (Some(message), _) => Err(ProviderError::Sdk(message)),
            (None, Some(json)) => Ok(json),
            (None, None) => Ok("[]".to_string()),
        };
        let _ = tx.send(result);
    });
    (callback, rx)
}

async fn settle<T>(rx: oneshot::Receiver<Result<T, ProviderError>>) -> Result<T, ProviderError> {
    rx.await.map_err(|_| ProviderError::CallbackDropped)?
}

/// Biomarker entry as serialized by the SDK
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBiomarker {
    value: serde_json::Value,
    #[serde(alias = "timestamp")]
    end_date_time: DateTime<Utc>,
}

/// The SDK reports numbers either as JSON numbers or as numeric strings
fn numeric(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_biomarkers(
    biomarker: BiomarkerType,
    json: &str,
) -> Result<Vec<BiomarkerSample>, ProviderError> {
    let entries: Vec<WireBiomarker> = serde_json::from_str(json)?;
    let total = entries.len();

    let samples: Vec<BiomarkerSample> = entries
        .into_iter()
        .filter_map(|entry| {
            numeric(&entry.value).map(|value| BiomarkerSample {
                value,
                timestamp: entry.end_date_time,
            })
        })
        .collect();

    if samples.len() < total {
        debug!(
            biomarker = biomarker.as_str(),
            skipped = total - samples.len(),
            "skipped non-numeric biomarker entries"
        );
    }

    Ok(samples)
}

#[async_trait]
impl<S: CallbackSdk> BiometricProvider for CallbackBridge<S> {
    fn is_supported(&self) -> bool {
        self.sdk.is_supported()
    }

    async fn configure(&self, environment: Environment) -> Result<(), ProviderError> {
        let (callback, rx) = setup_channel("configure");
        self.sdk.configure(environment, callback);
        settle(rx).await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), ProviderError> {
        let (callback, rx) = setup_channel("authenticate");
        self.sdk.authenticate(
            &credentials.app_id,
            &credentials.app_secret,
            &credentials.external_id,
            callback,
        );
        settle(rx).await
    }

    async fn enable_sensors(&self, sensors: &[Sensor]) -> Result<(), ProviderError> {
        let (callback, rx) = setup_channel("enable_sensors");
        self.sdk.enable_sensors(sensors, callback);
        settle(rx).await
    }

    async fn query_biomarker(
        &self,
        biomarker: BiomarkerType,
        category: BiomarkerCategory,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BiomarkerSample>, ProviderError> {
        let (callback, rx) = query_channel();
        self.sdk
            .get_biomarkers(category.as_str(), biomarker.as_str(), start_ms, end_ms, callback);
        let json = settle(rx).await?;
        decode_biomarkers(biomarker, &json)
    }

    async fn query_scores(
        &self,
        score_types: &[ScoreType],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ScoreResult>, ProviderError> {
        let names: Vec<&str> = score_types.iter().map(|s| s.as_str()).collect();
        let (callback, rx) = query_channel();
        self.sdk.get_scores(&names, start_ms, end_ms, callback);
        let json = settle(rx).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    /// SDK stub that answers from a background thread, like a native bridge
    #[derive(Default)]
    struct StubSdk {
        configure_ok: bool,
        auth_error: Option<String>,
        drop_sensor_callback: bool,
        biomarker_payload: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSdk {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    impl CallbackSdk for StubSdk {
        fn configure(&self, _environment: Environment, callback: SetupCallback) {
            self.record("configure");
            let ok = self.configure_ok;
            thread::spawn(move || callback(None, ok));
        }

        fn authenticate(&self, _app_id: &str, _app_secret: &str, external_id: &str, callback: SetupCallback) {
            self.record(&format!("authenticate:{external_id}"));
            let error = self.auth_error.clone();
            thread::spawn(move || callback(error, false));
        }

        fn enable_sensors(&self, _sensors: &[Sensor], callback: SetupCallback) {
            self.record("enable_sensors");
            if !self.drop_sensor_callback {
                callback(None, true);
            }
        }

        fn get_biomarkers(
            &self,
            category: &str,
            biomarker: &str,
            _start_ms: i64,
            _end_ms: i64,
            callback: QueryCallback,
        ) {
            self.record(&format!("biomarkers:{category}:{biomarker}"));
            let payload = self.biomarker_payload.clone();
            thread::spawn(move || callback(None, payload));
        }

        fn get_scores(&self, score_types: &[&str], _start_ms: i64, _end_ms: i64, callback: QueryCallback) {
            self.record(&format!("scores:{}", score_types.join(",")));
            callback(
                None,
                Some(r#"[{"type":"readiness","score":0.7,"factors":[{"name":"resting_heart_rate","value":61}]}]"#.to_string()),
            );
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            app_id: "app".to_string(),
            app_secret: "secret".to_string(),
            external_id: "user-42".to_string(),
        }
    }

    #[tokio::test]
    async fn test_setup_success_and_unsuccessful_flag() {
        let bridge = CallbackBridge::new(StubSdk {
            configure_ok: true,
            ..Default::default()
        });
        assert_eq!(bridge.configure(Environment::Sandbox).await, Ok(()));

        let bridge = CallbackBridge::new(StubSdk::default());
        assert_eq!(
            bridge.configure(Environment::Sandbox).await,
            Err(ProviderError::Unsuccessful("configure"))
        );
    }

    #[tokio::test]
    async fn test_authenticate_error_message_is_preserved() {
        let bridge = CallbackBridge::new(StubSdk {
            auth_error: Some("invalid app secret".to_string()),
            ..Default::default()
        });

        assert_eq!(
            bridge.authenticate(&credentials()).await,
            Err(ProviderError::Sdk("invalid app secret".to_string()))
        );
        assert_eq!(
            bridge.sdk().calls.lock().unwrap().as_slice(),
            &["authenticate:user-42".to_string()]
        );
    }

    #[tokio::test]
    async fn test_dropped_callback_is_an_error() {
        let bridge = CallbackBridge::new(StubSdk {
            drop_sensor_callback: true,
            ..Default::default()
        });

        assert_eq!(
            bridge.enable_sensors(&[Sensor::StepCount]).await,
            Err(ProviderError::CallbackDropped)
        );
    }

    #[tokio::test]
    async fn test_biomarker_payload_accepts_string_values() {
        let bridge = CallbackBridge::new(StubSdk {
            biomarker_payload: Some(
                r#"[
                    {"value": "4200", "endDateTime": "2024-01-15T10:00:00Z"},
                    {"value": 800.5, "endDateTime": "2024-01-15T18:00:00Z"},
                    {"value": "n/a", "endDateTime": "2024-01-15T19:00:00Z"}
                ]"#
                .to_string(),
            ),
            ..Default::default()
        });

        let samples = bridge
            .query_biomarker(BiomarkerType::Steps, BiomarkerCategory::Activity, 0, 1)
            .await
            .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 4200.0);
        assert_eq!(samples[1].value, 800.5);
        assert_eq!(
            bridge.sdk().calls.lock().unwrap().as_slice(),
            &["biomarkers:activity:steps".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_payload_is_empty() {
        let bridge = CallbackBridge::new(StubSdk::default());

        let samples = bridge
            .query_biomarker(BiomarkerType::Weight, BiomarkerCategory::Body, 0, 1)
            .await
            .unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let bridge = CallbackBridge::new(StubSdk {
            biomarker_payload: Some("{not json".to_string()),
            ..Default::default()
        });

        let result = bridge
            .query_biomarker(BiomarkerType::Weight, BiomarkerCategory::Body, 0, 1)
            .await;
        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_scores_are_decoded() {
        let bridge = CallbackBridge::new(StubSdk::default());

        let scores = bridge.query_scores(&ScoreType::ALL, 0, 1).await.unwrap();

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score_type, ScoreType::Readiness);
        assert_eq!(scores[0].factors[0].value, Some(61.0));
        assert_eq!(
            bridge.sdk().calls.lock().unwrap().as_slice(),
            &["scores:sleep,wellbeing,activity,readiness".to_string()]
        );
    }
}
