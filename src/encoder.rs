//! Snapshot encoding
//!
//! This module wraps a [`SnapshotReport`] into a self-describing JSON envelope
//! carrying producer metadata, the query window and a quality summary.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SnapshotError;
use crate::reconcile::SnapshotReport;
use crate::types::{HealthSnapshot, QueryWindow};
use crate::{PRODUCER_NAME, SNAPSHOT_CRATE_VERSION};

/// Current envelope schema version
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Query window in RFC 3339
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotWindow {
    pub start_utc: String,
    pub end_utc: String,
}

/// Quality summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuality {
    /// Fraction of populated fields (0-1)
    pub coverage: f64,
    /// `field:code` diagnostic flags
    pub flags: Vec<String>,
}

/// Complete snapshot envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub schema_version: String,
    pub producer: SnapshotProducer,
    pub window: SnapshotWindow,
    pub computed_at_utc: String,
    pub quality: SnapshotQuality,
    pub snapshot: HealthSnapshot,
}

/// Encoder producing snapshot envelopes
pub struct SnapshotEncoder {
    instance_id: String,
}

impl Default for SnapshotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, report: &SnapshotReport, window: &QueryWindow) -> SnapshotEnvelope {
        SnapshotEnvelope {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            producer: SnapshotProducer {
                name: PRODUCER_NAME.to_string(),
                version: SNAPSHOT_CRATE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            window: SnapshotWindow {
                start_utc: window.start.to_rfc3339(),
                end_utc: window.end.to_rfc3339(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            quality: SnapshotQuality {
                coverage: report.snapshot.coverage(),
                flags: report.flags(),
            },
            snapshot: report.snapshot.clone(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        report: &SnapshotReport,
        window: &QueryWindow,
    ) -> Result<String, SnapshotError> {
        let envelope = self.encode(report, window);
        serde_json::to_string_pretty(&envelope).map_err(SnapshotError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{RawReadings, Reconciler};
    use crate::types::BiomarkerType;
    use chrono::{Duration, TimeZone};

    fn window() -> QueryWindow {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        QueryWindow::new(start, start + Duration::days(1)).unwrap()
    }

    #[test]
    fn test_encode_envelope() {
        let mut raw = RawReadings::default();
        raw.biomarkers.insert(BiomarkerType::Steps, 8500.0);
        raw.biomarkers.insert(BiomarkerType::SleepEfficiency, 120.0);
        let report = Reconciler::reconcile(&raw);
        let encoder = SnapshotEncoder::with_instance_id("test-instance".to_string());

        let json = encoder.encode_to_json(&report, &window()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["schema_version"], "1.0.0");
        assert_eq!(payload["producer"]["name"], "health-snapshot");
        assert_eq!(payload["producer"]["instance_id"], "test-instance");
        assert_eq!(payload["window"]["start_utc"], "2024-01-15T00:00:00+00:00");
        assert_eq!(payload["snapshot"]["activity"]["steps"], 8500.0);
        assert!(payload["snapshot"]["sleep"]["efficiency"].is_null());

        let flags = payload["quality"]["flags"].as_array().unwrap();
        assert!(flags.iter().any(|f| f == "sleep_efficiency:value_out_of_range"));
    }

    #[test]
    fn test_consumer_reads_snapshot_back_from_envelope() {
        let mut raw = RawReadings::default();
        raw.biomarkers.insert(BiomarkerType::Weight, 70.4);
        raw.factors.insert("active_hours".to_string(), 1.5);
        let report = Reconciler::reconcile(&raw);
        let json = SnapshotEncoder::new().encode_to_json(&report, &window()).unwrap();

        let envelope: SnapshotEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(envelope.snapshot, report.snapshot);
        assert_eq!(envelope.snapshot.activity.active_duration, Some(5400.0));
        assert_eq!(envelope.quality.flags, report.flags());
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = SnapshotEncoder::new();
        let b = SnapshotEncoder::new();

        assert_ne!(a.instance_id, b.instance_id);
    }
}
