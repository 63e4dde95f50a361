//! Reconciliation of raw provider readings into a snapshot
//!
//! [`Reconciler::reconcile`] is a pure function of [`RawReadings`]: it walks the
//! [`FIELD_RULES`] table, picks one source per field, converts units and rejects
//! implausible values. Every decision that leaves a field empty or swaps the
//! source is recorded as a [`FieldDiagnostic`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::rules::{FieldRule, Source, FIELD_RULES};
use crate::types::{BiomarkerType, HealthSnapshot, ScoreResult, ScoreType, SnapshotField};

/// Everything the provider returned for one window, already reduced per query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReadings {
    /// Aggregated biomarker values
    #[serde(default)]
    pub biomarkers: BTreeMap<BiomarkerType, f64>,
    /// Top-level wellness scores
    #[serde(default)]
    pub scores: BTreeMap<ScoreType, f64>,
    /// Score sub-factors by name
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
    /// Biomarker queries that failed, with the provider message
    #[serde(default)]
    pub failed_queries: BTreeMap<BiomarkerType, String>,
}

impl RawReadings {
    /// Fold score results into top-level scores and a factor map.
    ///
    /// Later results win: the last score of each type, and the last value seen
    /// for each factor name. Absent and non-finite values are skipped.
    pub fn absorb_scores(&mut self, results: &[ScoreResult]) {
        for result in results {
            if let Some(score) = result.score.filter(|s| s.is_finite()) {
                self.scores.insert(result.score_type, score);
            }
            for factor in &result.factors {
                if let Some(value) = factor.value.filter(|v| v.is_finite()) {
                    self.factors.insert(factor.name.clone(), value);
                }
            }
        }
    }

    fn lookup(&self, source: &Source) -> Option<f64> {
        let value = match source {
            Source::Biomarker(b) => self.biomarkers.get(b).copied(),
            Source::Factor(name) => self.factors.get(*name).copied(),
            Source::Score(s) => self.scores.get(s).copied(),
        };
        value.filter(|v| v.is_finite())
    }
}

/// Why a field is empty, or where its value came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No candidate source carried a value
    PartialDataUnavailable,
    /// The biomarker query backing this field failed
    QueryFailed { message: String },
    /// A value was discarded as implausible
    ValueOutOfRange { source: String, value: f64 },
    /// The value came from a score factor because the biomarker was empty
    FactorFallback { factor: String },
}

impl DiagnosticKind {
    /// Stable short code used in quality flags
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::PartialDataUnavailable => "partial_data_unavailable",
            DiagnosticKind::QueryFailed { .. } => "query_failed",
            DiagnosticKind::ValueOutOfRange { .. } => "value_out_of_range",
            DiagnosticKind::FactorFallback { .. } => "factor_fallback",
        }
    }
}

/// Diagnostic attached to one snapshot field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiagnostic {
    pub field: SnapshotField,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

/// A snapshot together with the reasons behind its empty or substituted fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotReport {
    pub snapshot: HealthSnapshot,
    pub diagnostics: Vec<FieldDiagnostic>,
}

impl SnapshotReport {
    pub fn diagnostics_for(&self, field: SnapshotField) -> impl Iterator<Item = &DiagnosticKind> {
        self.diagnostics
            .iter()
            .filter(move |d| d.field == field)
            .map(|d| &d.kind)
    }

    /// Sorted, de-duplicated `field:code` flags
    pub fn flags(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| format!("{}:{}", d.field.as_str(), d.kind.code()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Applies the field rules to raw readings
pub struct Reconciler;

impl Reconciler {
    /// Reconcile raw readings into a snapshot report
    pub fn reconcile(readings: &RawReadings) -> SnapshotReport {
        Self::reconcile_with(FIELD_RULES, readings)
    }

    /// Reconcile with an explicit rule table
    pub fn reconcile_with(rules: &[FieldRule], readings: &RawReadings) -> SnapshotReport {
        let mut values = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for rule in rules {
            if let Some(value) = resolve_field(rule, readings, &mut diagnostics) {
                values.insert(rule.field, value);
            }
        }

        SnapshotReport {
            snapshot: HealthSnapshot::from_fields(&values),
            diagnostics,
        }
    }
}

/// Resolve one field: first accepted candidate, then field-level range check
fn resolve_field(
    rule: &FieldRule,
    readings: &RawReadings,
    diagnostics: &mut Vec<FieldDiagnostic>,
) -> Option<f64> {
    let field = rule.field;
    let mut push = |kind: DiagnosticKind| diagnostics.push(FieldDiagnostic { field, kind });

    let mut failed = BTreeSet::new();
    for candidate in rule.candidates {
        if let Source::Biomarker(b) = candidate.source {
            if let Some(message) = readings.failed_queries.get(&b) {
                if failed.insert(b) {
                    push(DiagnosticKind::QueryFailed {
                        message: message.clone(),
                    });
                }
            }
        }
    }

    let mut chosen = None;
    let mut skipped_biomarker = false;
    let mut rejected = Vec::new();

    for candidate in rule.candidates {
        let Some(raw) = readings.lookup(&candidate.source) else {
            if matches!(candidate.source, Source::Biomarker(_)) {
                skipped_biomarker = true;
            }
            continue;
        };

        if let Some(accept) = candidate.accept {
            if !accept.contains(raw) {
                debug!(
                    field = field.as_str(),
                    source = %candidate.source,
                    value = raw,
                    accept = %accept,
                    "candidate outside accepted window"
                );
                rejected.push(DiagnosticKind::ValueOutOfRange {
                    source: candidate.source.to_string(),
                    value: raw,
                });
                continue;
            }
        }

        let scaled = raw * candidate.multiplier;
        if !scaled.is_finite() {
            debug!(
                field = field.as_str(),
                source = %candidate.source,
                value = raw,
                "candidate overflows after unit conversion"
            );
            rejected.push(DiagnosticKind::ValueOutOfRange {
                source: candidate.source.to_string(),
                value: raw,
            });
            continue;
        }

        chosen = Some((candidate, scaled));
        break;
    }

    let Some((candidate, value)) = chosen else {
        if rejected.is_empty() {
            debug!(field = field.as_str(), "no data for field");
            push(DiagnosticKind::PartialDataUnavailable);
        } else {
            warn!(field = field.as_str(), "no candidate value inside its accepted window");
            rejected.into_iter().for_each(&mut push);
        }
        return None;
    };

    if let Some(range) = rule.range {
        if !range.contains(value) {
            warn!(
                field = field.as_str(),
                source = %candidate.source,
                value,
                range = %range,
                "rejecting implausible value"
            );
            push(DiagnosticKind::ValueOutOfRange {
                source: candidate.source.to_string(),
                value,
            });
            return None;
        }
    }

    if let Source::Factor(name) = candidate.source {
        if skipped_biomarker {
            debug!(field = field.as_str(), factor = name, "using score factor fallback");
            push(DiagnosticKind::FactorFallback {
                factor: name.to_string(),
            });
        }
    }

    Some(value)
}
