//! JSON-backed provider
//!
//! Replays a captured provider state from a JSON document. Used by the CLI to
//! aggregate offline and by tests to script provider behavior.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::BiometricProvider;
use crate::error::{ProviderError, SnapshotError};
use crate::types::{
    BiomarkerCategory, BiomarkerSample, BiomarkerType, Credentials, Environment, ScoreResult,
    ScoreType, Sensor,
};

fn default_supported() -> bool {
    true
}

/// Provider state described by a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureDocument {
    /// Whether the provider runs on this platform
    #[serde(default = "default_supported")]
    pub supported: bool,
    /// Error returned from `configure`, if any
    #[serde(default)]
    pub configure_error: Option<String>,
    /// Error returned from `authenticate`, if any
    #[serde(default)]
    pub authenticate_error: Option<String>,
    /// Error returned from `enable_sensors`, if any
    #[serde(default)]
    pub sensors_error: Option<String>,
    /// Samples per biomarker
    #[serde(default)]
    pub biomarkers: BTreeMap<BiomarkerType, Vec<BiomarkerSample>>,
    /// Biomarker queries that fail with the given message
    #[serde(default)]
    pub failing_biomarkers: BTreeMap<BiomarkerType, String>,
    /// Score results, returned when their type is requested
    #[serde(default)]
    pub scores: Vec<ScoreResult>,
    /// Error returned from the scores query, if any
    #[serde(default)]
    pub scores_error: Option<String>,
}

impl Default for FixtureDocument {
    fn default() -> Self {
        Self {
            supported: true,
            configure_error: None,
            authenticate_error: None,
            sensors_error: None,
            biomarkers: BTreeMap::new(),
            failing_biomarkers: BTreeMap::new(),
            scores: Vec::new(),
            scores_error: None,
        }
    }
}

/// In-memory provider replaying a [`FixtureDocument`]
#[derive(Debug, Default)]
pub struct FixtureProvider {
    document: FixtureDocument,
    biomarker_queries: AtomicUsize,
    score_queries: AtomicUsize,
}

impl FixtureProvider {
    pub fn new(document: FixtureDocument) -> Self {
        Self {
            document,
            biomarker_queries: AtomicUsize::new(0),
            score_queries: AtomicUsize::new(0),
        }
    }

    /// Parse a fixture from JSON
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let document: FixtureDocument = serde_json::from_str(json)?;
        Ok(Self::new(document))
    }

    pub fn document(&self) -> &FixtureDocument {
        &self.document
    }

    /// Number of biomarker queries served so far
    pub fn biomarker_queries(&self) -> usize {
        self.biomarker_queries.load(Ordering::SeqCst)
    }

    /// Number of score queries served so far
    pub fn score_queries(&self) -> usize {
        self.score_queries.load(Ordering::SeqCst)
    }
}

fn setup_result(error: &Option<String>) -> Result<(), ProviderError> {
    match error {
        Some(message) => Err(ProviderError::Sdk(message.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl BiometricProvider for FixtureProvider {
    fn is_supported(&self) -> bool {
        self.document.supported
    }

    async fn configure(&self, _environment: Environment) -> Result<(), ProviderError> {
        setup_result(&self.document.configure_error)
    }

    async fn authenticate(&self, _credentials: &Credentials) -> Result<(), ProviderError> {
        setup_result(&self.document.authenticate_error)
    }

    async fn enable_sensors(&self, _sensors: &[Sensor]) -> Result<(), ProviderError> {
        setup_result(&self.document.sensors_error)
    }

    async fn query_biomarker(
        &self,
        biomarker: BiomarkerType,
        _category: BiomarkerCategory,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BiomarkerSample>, ProviderError> {
        self.biomarker_queries.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.document.failing_biomarkers.get(&biomarker) {
            return Err(ProviderError::Sdk(message.clone()));
        }

        let samples = self
            .document
            .biomarkers
            .get(&biomarker)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| {
                        let ts = s.timestamp.timestamp_millis();
                        ts >= start_ms && ts < end_ms
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(samples)
    }

    async fn query_scores(
        &self,
        score_types: &[ScoreType],
        _start_ms: i64,
        _end_ms: i64,
    ) -> Result<Vec<ScoreResult>, ProviderError> {
        self.score_queries.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.document.scores_error {
            return Err(ProviderError::Sdk(message.clone()));
        }

        let wanted: BTreeSet<ScoreType> = score_types.iter().copied().collect();
        Ok(self
            .document
            .scores
            .iter()
            .filter(|s| wanted.contains(&s.score_type))
            .cloned()
            .collect())
    }
}
