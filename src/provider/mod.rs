//! Biometrics provider seam
//!
//! The aggregator talks to the external biometrics SDK only through
//! [`BiometricProvider`]. Any implementation is interchangeable: a native SDK
//! wrapped with [`CallbackBridge`], or the JSON-backed [`FixtureProvider`].

mod callback;
mod fixture;

pub use callback::{CallbackBridge, CallbackSdk, QueryCallback, SetupCallback};
pub use fixture::{FixtureDocument, FixtureProvider};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{
    BiomarkerCategory, BiomarkerSample, BiomarkerType, Credentials, Environment, ScoreResult,
    ScoreType, Sensor,
};

/// Abstract surface of an external biometrics provider
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so queries can be driven concurrently.
#[async_trait]
pub trait BiometricProvider: Send + Sync {
    /// Whether the provider can run on the current platform
    fn is_supported(&self) -> bool {
        true
    }

    /// Configure the SDK for an environment
    async fn configure(&self, environment: Environment) -> Result<(), ProviderError>;

    /// Authenticate a user profile. Skipped in local-sensor-only mode.
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), ProviderError>;

    /// Request collection from device sensors
    async fn enable_sensors(&self, sensors: &[Sensor]) -> Result<(), ProviderError>;

    /// Fetch samples for one biomarker over `[start_ms, end_ms)`
    async fn query_biomarker(
        &self,
        biomarker: BiomarkerType,
        category: BiomarkerCategory,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BiomarkerSample>, ProviderError>;

    /// Fetch wellness scores and their factors over `[start_ms, end_ms)`
    async fn query_scores(
        &self,
        score_types: &[ScoreType],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<ScoreResult>, ProviderError>;
}
