//! Core types for health snapshot aggregation
//!
//! This module defines the values exchanged with a biometrics provider
//! (samples, score results) and the immutable [`HealthSnapshot`] produced for a
//! query window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SnapshotError;

/// Biomarker types requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomarkerType {
    RestingHeartRate,
    HeartRateSleep,
    HeartRateVariabilitySdnn,
    RespiratoryRate,
    OxygenSaturation,
    Vo2Max,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    BodyTemperatureBasal,
    Steps,
    FloorsClimbed,
    ActiveEnergyBurned,
    TotalEnergyBurned,
    ActiveDuration,
    ExerciseTime,
    Weight,
    Height,
    BodyMassIndex,
    BodyFat,
    LeanMass,
    SleepDuration,
    SleepEfficiency,
    SleepLatency,
    SleepDeepDuration,
    SleepRemDuration,
    SleepLightDuration,
}

impl BiomarkerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiomarkerType::RestingHeartRate => "resting_heart_rate",
            BiomarkerType::HeartRateSleep => "heart_rate_sleep",
            BiomarkerType::HeartRateVariabilitySdnn => "heart_rate_variability_sdnn",
            BiomarkerType::RespiratoryRate => "respiratory_rate",
            BiomarkerType::OxygenSaturation => "oxygen_saturation",
            BiomarkerType::Vo2Max => "vo2_max",
            BiomarkerType::BloodPressureSystolic => "blood_pressure_systolic",
            BiomarkerType::BloodPressureDiastolic => "blood_pressure_diastolic",
            BiomarkerType::BodyTemperatureBasal => "body_temperature_basal",
            BiomarkerType::Steps => "steps",
            BiomarkerType::FloorsClimbed => "floors_climbed",
            BiomarkerType::ActiveEnergyBurned => "active_energy_burned",
            BiomarkerType::TotalEnergyBurned => "total_energy_burned",
            BiomarkerType::ActiveDuration => "active_duration",
            BiomarkerType::ExerciseTime => "exercise_time",
            BiomarkerType::Weight => "weight",
            BiomarkerType::Height => "height",
            BiomarkerType::BodyMassIndex => "body_mass_index",
            BiomarkerType::BodyFat => "body_fat",
            BiomarkerType::LeanMass => "lean_mass",
            BiomarkerType::SleepDuration => "sleep_duration",
            BiomarkerType::SleepEfficiency => "sleep_efficiency",
            BiomarkerType::SleepLatency => "sleep_latency",
            BiomarkerType::SleepDeepDuration => "sleep_deep_duration",
            BiomarkerType::SleepRemDuration => "sleep_rem_duration",
            BiomarkerType::SleepLightDuration => "sleep_light_duration",
        }
    }
}

/// Provider-side grouping of biomarkers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomarkerCategory {
    Activity,
    Body,
    Sleep,
    Vitals,
}

impl BiomarkerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiomarkerCategory::Activity => "activity",
            BiomarkerCategory::Body => "body",
            BiomarkerCategory::Sleep => "sleep",
            BiomarkerCategory::Vitals => "vitals",
        }
    }
}

/// Composite wellness score types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    Sleep,
    Wellbeing,
    Activity,
    Readiness,
}

impl ScoreType {
    pub const ALL: [ScoreType; 4] = [
        ScoreType::Sleep,
        ScoreType::Wellbeing,
        ScoreType::Activity,
        ScoreType::Readiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Sleep => "sleep",
            ScoreType::Wellbeing => "wellbeing",
            ScoreType::Activity => "activity",
            ScoreType::Readiness => "readiness",
        }
    }
}

/// Device sensors the provider can collect from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    Sleep,
    StepCount,
    FloorCount,
    HeartRate,
    RestingHeartRate,
    HeartRateVariability,
    ActiveEnergyBurned,
    TotalEnergyBurned,
    ExerciseTime,
    RespiratoryRate,
    OxygenSaturation,
    Vo2Max,
    BloodPressure,
    BodyTemperature,
    Weight,
    Height,
    BodyMassIndex,
    BodyFat,
    LeanBodyMass,
}

/// Provider deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

/// Credentials for an authenticated provider session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub external_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("external_id", &self.external_id)
            .finish()
    }
}

/// A single biomarker reading returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerSample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Named sub-component of a wellness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
}

/// One wellness score as returned by the scores query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(rename = "type")]
    pub score_type: ScoreType,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub factors: Vec<ScoreFactor>,
}

/// Half-open time window `[start, end)` for one aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// Build a window, rejecting empty or inverted ranges
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SnapshotError> {
        if start >= end {
            return Err(SnapshotError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// Domain group a snapshot field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Vitals,
    Activity,
    BodyComposition,
    Sleep,
    Scores,
}

/// Every field carried by a [`HealthSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    RestingHeartRate,
    SleepHeartRate,
    HeartRateVariability,
    RespiratoryRate,
    OxygenSaturation,
    Vo2Max,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    BodyTemperature,
    Steps,
    FloorsClimbed,
    ActiveEnergyBurned,
    TotalEnergyBurned,
    ActiveDuration,
    ExerciseTime,
    Weight,
    Height,
    Bmi,
    BodyFat,
    LeanBodyMass,
    SleepDuration,
    SleepEfficiency,
    SleepLatency,
    SleepDeepDuration,
    SleepRemDuration,
    SleepLightDuration,
    SleepScore,
    WellbeingScore,
    ActivityScore,
    ReadinessScore,
}

impl SnapshotField {
    pub const ALL: [SnapshotField; 30] = [
        SnapshotField::RestingHeartRate,
        SnapshotField::SleepHeartRate,
        SnapshotField::HeartRateVariability,
        SnapshotField::RespiratoryRate,
        SnapshotField::OxygenSaturation,
        SnapshotField::Vo2Max,
        SnapshotField::BloodPressureSystolic,
        SnapshotField::BloodPressureDiastolic,
        SnapshotField::BodyTemperature,
        SnapshotField::Steps,
        SnapshotField::FloorsClimbed,
        SnapshotField::ActiveEnergyBurned,
        SnapshotField::TotalEnergyBurned,
        SnapshotField::ActiveDuration,
        SnapshotField::ExerciseTime,
        SnapshotField::Weight,
        SnapshotField::Height,
        SnapshotField::Bmi,
        SnapshotField::BodyFat,
        SnapshotField::LeanBodyMass,
        SnapshotField::SleepDuration,
        SnapshotField::SleepEfficiency,
        SnapshotField::SleepLatency,
        SnapshotField::SleepDeepDuration,
        SnapshotField::SleepRemDuration,
        SnapshotField::SleepLightDuration,
        SnapshotField::SleepScore,
        SnapshotField::WellbeingScore,
        SnapshotField::ActivityScore,
        SnapshotField::ReadinessScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::RestingHeartRate => "resting_heart_rate",
            SnapshotField::SleepHeartRate => "sleep_heart_rate",
            SnapshotField::HeartRateVariability => "heart_rate_variability",
            SnapshotField::RespiratoryRate => "respiratory_rate",
            SnapshotField::OxygenSaturation => "oxygen_saturation",
            SnapshotField::Vo2Max => "vo2_max",
            SnapshotField::BloodPressureSystolic => "blood_pressure_systolic",
            SnapshotField::BloodPressureDiastolic => "blood_pressure_diastolic",
            SnapshotField::BodyTemperature => "body_temperature",
            SnapshotField::Steps => "steps",
            SnapshotField::FloorsClimbed => "floors_climbed",
            SnapshotField::ActiveEnergyBurned => "active_energy_burned",
            SnapshotField::TotalEnergyBurned => "total_energy_burned",
            SnapshotField::ActiveDuration => "active_duration",
            SnapshotField::ExerciseTime => "exercise_time",
            SnapshotField::Weight => "weight",
            SnapshotField::Height => "height",
            SnapshotField::Bmi => "bmi",
            SnapshotField::BodyFat => "body_fat",
            SnapshotField::LeanBodyMass => "lean_body_mass",
            SnapshotField::SleepDuration => "sleep_duration",
            SnapshotField::SleepEfficiency => "sleep_efficiency",
            SnapshotField::SleepLatency => "sleep_latency",
            SnapshotField::SleepDeepDuration => "sleep_deep_duration",
            SnapshotField::SleepRemDuration => "sleep_rem_duration",
            SnapshotField::SleepLightDuration => "sleep_light_duration",
            SnapshotField::SleepScore => "sleep_score",
            SnapshotField::WellbeingScore => "wellbeing_score",
            SnapshotField::ActivityScore => "activity_score",
            SnapshotField::ReadinessScore => "readiness_score",
        }
    }

    /// Canonical unit of the field within a snapshot
    pub fn unit(&self) -> &'static str {
        match self {
            SnapshotField::RestingHeartRate | SnapshotField::SleepHeartRate => "bpm",
            SnapshotField::HeartRateVariability => "ms",
            SnapshotField::RespiratoryRate => "breaths/min",
            SnapshotField::OxygenSaturation | SnapshotField::BodyFat => "%",
            SnapshotField::Vo2Max => "ml/kg/min",
            SnapshotField::BloodPressureSystolic | SnapshotField::BloodPressureDiastolic => {
                "mmHg"
            }
            SnapshotField::BodyTemperature => "degC",
            SnapshotField::Steps => "steps",
            SnapshotField::FloorsClimbed => "floors",
            SnapshotField::ActiveEnergyBurned | SnapshotField::TotalEnergyBurned => "kcal",
            SnapshotField::ActiveDuration
            | SnapshotField::SleepDuration
            | SnapshotField::SleepLatency
            | SnapshotField::SleepDeepDuration
            | SnapshotField::SleepRemDuration
            | SnapshotField::SleepLightDuration => "s",
            SnapshotField::ExerciseTime => "min",
            SnapshotField::Weight | SnapshotField::LeanBodyMass => "kg",
            SnapshotField::Height => "m",
            SnapshotField::Bmi => "kg/m2",
            SnapshotField::SleepEfficiency => "%",
            SnapshotField::SleepScore
            | SnapshotField::WellbeingScore
            | SnapshotField::ActivityScore
            | SnapshotField::ReadinessScore => "fraction",
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            SnapshotField::RestingHeartRate
            | SnapshotField::SleepHeartRate
            | SnapshotField::HeartRateVariability
            | SnapshotField::RespiratoryRate
            | SnapshotField::OxygenSaturation
            | SnapshotField::Vo2Max
            | SnapshotField::BloodPressureSystolic
            | SnapshotField::BloodPressureDiastolic
            | SnapshotField::BodyTemperature => FieldGroup::Vitals,
            SnapshotField::Steps
            | SnapshotField::FloorsClimbed
            | SnapshotField::ActiveEnergyBurned
            | SnapshotField::TotalEnergyBurned
            | SnapshotField::ActiveDuration
            | SnapshotField::ExerciseTime => FieldGroup::Activity,
            SnapshotField::Weight
            | SnapshotField::Height
            | SnapshotField::Bmi
            | SnapshotField::BodyFat
            | SnapshotField::LeanBodyMass => FieldGroup::BodyComposition,
            SnapshotField::SleepDuration
            | SnapshotField::SleepEfficiency
            | SnapshotField::SleepLatency
            | SnapshotField::SleepDeepDuration
            | SnapshotField::SleepRemDuration
            | SnapshotField::SleepLightDuration => FieldGroup::Sleep,
            SnapshotField::SleepScore
            | SnapshotField::WellbeingScore
            | SnapshotField::ActivityScore
            | SnapshotField::ReadinessScore => FieldGroup::Scores,
        }
    }
}

/// Vital signs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Resting heart rate (bpm)
    pub resting_heart_rate: Option<f64>,
    /// Heart rate during sleep (bpm)
    pub sleep_heart_rate: Option<f64>,
    /// Heart rate variability, SDNN (ms)
    pub heart_rate_variability: Option<f64>,
    /// Respiratory rate (breaths per minute)
    pub respiratory_rate: Option<f64>,
    /// Blood oxygen saturation (percentage)
    pub oxygen_saturation: Option<f64>,
    /// VO2max (ml/kg/min)
    pub vo2_max: Option<f64>,
    /// Systolic blood pressure (mmHg)
    pub blood_pressure_systolic: Option<f64>,
    /// Diastolic blood pressure (mmHg)
    pub blood_pressure_diastolic: Option<f64>,
    /// Basal body temperature (celsius)
    pub body_temperature: Option<f64>,
}

/// Activity totals over the window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub steps: Option<f64>,
    pub floors_climbed: Option<f64>,
    /// Active energy burned (kcal)
    pub active_energy_burned: Option<f64>,
    /// Total energy burned (kcal)
    pub total_energy_burned: Option<f64>,
    /// Active duration (seconds)
    pub active_duration: Option<f64>,
    /// Exercise time (minutes)
    pub exercise_time: Option<f64>,
}

/// Body composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    /// Weight (kg)
    pub weight: Option<f64>,
    /// Height (m)
    pub height: Option<f64>,
    pub bmi: Option<f64>,
    /// Body fat (percentage)
    pub body_fat: Option<f64>,
    /// Lean body mass (kg)
    pub lean_body_mass: Option<f64>,
}

/// Sleep metrics, durations in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sleep {
    pub duration: Option<f64>,
    /// Sleep efficiency (0-100)
    pub efficiency: Option<f64>,
    pub latency: Option<f64>,
    pub deep_duration: Option<f64>,
    pub rem_duration: Option<f64>,
    pub light_duration: Option<f64>,
}

/// Wellness scores, each a fraction in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellnessScores {
    pub sleep: Option<f64>,
    pub wellbeing: Option<f64>,
    pub activity: Option<f64>,
    pub readiness: Option<f64>,
}

/// One fully reconciled bundle of health metrics for a query window
///
/// Built only by [`crate::reconcile::Reconciler`]. `Deserialize` reads snapshots
/// back out of encoded envelopes and captured reports; `Default` is all-null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub vitals: Vitals,
    pub activity: Activity,
    pub body: BodyComposition,
    pub sleep: Sleep,
    pub scores: WellnessScores,
}

impl HealthSnapshot {
    /// Assemble a snapshot from resolved field values; missing keys stay `None`
    pub(crate) fn from_fields(values: &BTreeMap<SnapshotField, f64>) -> Self {
        let get = |field: SnapshotField| values.get(&field).copied();

        HealthSnapshot {
            vitals: Vitals {
                resting_heart_rate: get(SnapshotField::RestingHeartRate),
                sleep_heart_rate: get(SnapshotField::SleepHeartRate),
                heart_rate_variability: get(SnapshotField::HeartRateVariability),
                respiratory_rate: get(SnapshotField::RespiratoryRate),
                oxygen_saturation: get(SnapshotField::OxygenSaturation),
                vo2_max: get(SnapshotField::Vo2Max),
                blood_pressure_systolic: get(SnapshotField::BloodPressureSystolic),
                blood_pressure_diastolic: get(SnapshotField::BloodPressureDiastolic),
                body_temperature: get(SnapshotField::BodyTemperature),
            },
            activity: Activity {
                steps: get(SnapshotField::Steps),
                floors_climbed: get(SnapshotField::FloorsClimbed),
                active_energy_burned: get(SnapshotField::ActiveEnergyBurned),
                total_energy_burned: get(SnapshotField::TotalEnergyBurned),
                active_duration: get(SnapshotField::ActiveDuration),
                exercise_time: get(SnapshotField::ExerciseTime),
            },
            body: BodyComposition {
                weight: get(SnapshotField::Weight),
                height: get(SnapshotField::Height),
                bmi: get(SnapshotField::Bmi),
                body_fat: get(SnapshotField::BodyFat),
                lean_body_mass: get(SnapshotField::LeanBodyMass),
            },
            sleep: Sleep {
                duration: get(SnapshotField::SleepDuration),
                efficiency: get(SnapshotField::SleepEfficiency),
                latency: get(SnapshotField::SleepLatency),
                deep_duration: get(SnapshotField::SleepDeepDuration),
                rem_duration: get(SnapshotField::SleepRemDuration),
                light_duration: get(SnapshotField::SleepLightDuration),
            },
            scores: WellnessScores {
                sleep: get(SnapshotField::SleepScore),
                wellbeing: get(SnapshotField::WellbeingScore),
                activity: get(SnapshotField::ActivityScore),
                readiness: get(SnapshotField::ReadinessScore),
            },
        }
    }

    /// Read a single field by name
    pub fn value(&self, field: SnapshotField) -> Option<f64> {
        match field {
            SnapshotField::RestingHeartRate => self.vitals.resting_heart_rate,
            SnapshotField::SleepHeartRate => self.vitals.sleep_heart_rate,
            SnapshotField::HeartRateVariability => self.vitals.heart_rate_variability,
            SnapshotField::RespiratoryRate => self.vitals.respiratory_rate,
            SnapshotField::OxygenSaturation => self.vitals.oxygen_saturation,
            SnapshotField::Vo2Max => self.vitals.vo2_max,
            SnapshotField::BloodPressureSystolic => self.vitals.blood_pressure_systolic,
            SnapshotField::BloodPressureDiastolic => self.vitals.blood_pressure_diastolic,
            SnapshotField::BodyTemperature => self.vitals.body_temperature,
            SnapshotField::Steps => self.activity.steps,
            SnapshotField::FloorsClimbed => self.activity.floors_climbed,
            SnapshotField::ActiveEnergyBurned => self.activity.active_energy_burned,
            SnapshotField::TotalEnergyBurned => self.activity.total_energy_burned,
            SnapshotField::ActiveDuration => self.activity.active_duration,
            SnapshotField::ExerciseTime => self.activity.exercise_time,
            SnapshotField::Weight => self.body.weight,
            SnapshotField::Height => self.body.height,
            SnapshotField::Bmi => self.body.bmi,
            SnapshotField::BodyFat => self.body.body_fat,
            SnapshotField::LeanBodyMass => self.body.lean_body_mass,
            SnapshotField::SleepDuration => self.sleep.duration,
            SnapshotField::SleepEfficiency => self.sleep.efficiency,
            SnapshotField::SleepLatency => self.sleep.latency,
            SnapshotField::SleepDeepDuration => self.sleep.deep_duration,
            SnapshotField::SleepRemDuration => self.sleep.rem_duration,
            SnapshotField::SleepLightDuration => self.sleep.light_duration,
            SnapshotField::SleepScore => self.scores.sleep,
            SnapshotField::WellbeingScore => self.scores.wellbeing,
            SnapshotField::ActivityScore => self.scores.activity,
            SnapshotField::ReadinessScore => self.scores.readiness,
        }
    }

    /// Fraction of fields that carry data (0-1)
    pub fn coverage(&self) -> f64 {
        let present = SnapshotField::ALL
            .iter()
            .filter(|field| self.value(**field).is_some())
            .count();
        present as f64 / SnapshotField::ALL.len() as f64
    }
}
