//! Field resolution rules
//!
//! Every snapshot field is resolved from an ordered list of candidate sources.
//! The first candidate with a finite value inside its acceptance range wins and
//! is scaled into the field's canonical unit; the result must then fall inside
//! the field's plausibility range or the field is rejected to `None`. Values
//! are never clamped.
//!
//! The provider exposes some quantities through two channels (a raw biomarker
//! and a score factor) with different reliability and units. Biomarkers are
//! preferred, except for sleep duration where the factor is tried first.

use serde::Serialize;
use std::fmt;

use crate::types::{BiomarkerType, ScoreType, SnapshotField};

/// Minutes to seconds
pub const MINUTES: f64 = 60.0;
/// Hours to seconds
pub const HOURS: f64 = 3600.0;

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Where a candidate value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Source {
    Biomarker(BiomarkerType),
    Factor(&'static str),
    Score(ScoreType),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Biomarker(b) => write!(f, "biomarker:{}", b.as_str()),
            Source::Factor(name) => write!(f, "factor:{name}"),
            Source::Score(s) => write!(f, "score:{}", s.as_str()),
        }
    }
}

/// One candidate source for a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub source: Source,
    /// Raw-value window this candidate is trusted in, checked before scaling
    pub accept: Option<ValueRange>,
    /// Scale from the source unit to the field's canonical unit
    pub multiplier: f64,
}

impl Candidate {
    pub const fn biomarker(biomarker: BiomarkerType) -> Self {
        Self {
            source: Source::Biomarker(biomarker),
            accept: None,
            multiplier: 1.0,
        }
    }

    pub const fn factor(name: &'static str) -> Self {
        Self {
            source: Source::Factor(name),
            accept: None,
            multiplier: 1.0,
        }
    }

    pub const fn score(score: ScoreType) -> Self {
        Self {
            source: Source::Score(score),
            accept: None,
            multiplier: 1.0,
        }
    }

    pub const fn accepting(mut self, min: f64, max: f64) -> Self {
        self.accept = Some(ValueRange::new(min, max));
        self
    }

    pub const fn scaled(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// Resolution rule for one snapshot field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldRule {
    pub field: SnapshotField,
    pub candidates: &'static [Candidate],
    /// Plausibility range in the canonical unit
    pub range: Option<ValueRange>,
}

const fn rule(field: SnapshotField, candidates: &'static [Candidate]) -> FieldRule {
    FieldRule {
        field,
        candidates,
        range: None,
    }
}

const fn ranged(
    field: SnapshotField,
    candidates: &'static [Candidate],
    min: f64,
    max: f64,
) -> FieldRule {
    FieldRule {
        field,
        candidates,
        range: Some(ValueRange::new(min, max)),
    }
}

/// Sleep duration window accepted from the factor, in minutes (2-20 h)
pub const SLEEP_FACTOR_MINUTES: ValueRange = ValueRange::new(120.0, 1200.0);
/// Sleep duration window accepted from the biomarker, in seconds (2-16 h)
pub const SLEEP_BIOMARKER_SECONDS: ValueRange = ValueRange::new(7200.0, 57600.0);

/// Unit-ambiguous sleep duration. The provider reports the same field in
/// minutes or seconds depending on the channel, so the magnitude decides.
const SLEEP_DURATION: &[Candidate] = &[
    Candidate::factor("sleep_duration")
        .accepting(SLEEP_FACTOR_MINUTES.min, SLEEP_FACTOR_MINUTES.max)
        .scaled(MINUTES),
    Candidate::biomarker(BiomarkerType::SleepDuration)
        .accepting(SLEEP_BIOMARKER_SECONDS.min, SLEEP_BIOMARKER_SECONDS.max),
    Candidate::biomarker(BiomarkerType::SleepDuration)
        .accepting(SLEEP_FACTOR_MINUTES.min, SLEEP_FACTOR_MINUTES.max)
        .scaled(MINUTES),
];

const RESTING_HEART_RATE: &[Candidate] = &[
    Candidate::biomarker(BiomarkerType::RestingHeartRate),
    Candidate::factor("resting_heart_rate"),
];
const STEPS: &[Candidate] = &[
    Candidate::biomarker(BiomarkerType::Steps),
    Candidate::factor("steps"),
];
const ACTIVE_ENERGY_BURNED: &[Candidate] = &[
    Candidate::biomarker(BiomarkerType::ActiveEnergyBurned),
    Candidate::factor("active_calories"),
];
const ACTIVE_DURATION: &[Candidate] = &[
    Candidate::biomarker(BiomarkerType::ActiveDuration),
    Candidate::factor("active_hours").scaled(HOURS),
];

const SLEEP_HEART_RATE: &[Candidate] = &[Candidate::biomarker(BiomarkerType::HeartRateSleep)];
const HEART_RATE_VARIABILITY: &[Candidate] =
    &[Candidate::biomarker(BiomarkerType::HeartRateVariabilitySdnn)];
const RESPIRATORY_RATE: &[Candidate] = &[Candidate::biomarker(BiomarkerType::RespiratoryRate)];
const OXYGEN_SATURATION: &[Candidate] = &[Candidate::biomarker(BiomarkerType::OxygenSaturation)];
const VO2_MAX: &[Candidate] = &[Candidate::biomarker(BiomarkerType::Vo2Max)];
const BLOOD_PRESSURE_SYSTOLIC: &[Candidate] =
    &[Candidate::biomarker(BiomarkerType::BloodPressureSystolic)];
const BLOOD_PRESSURE_DIASTOLIC: &[Candidate] =
    &[Candidate::biomarker(BiomarkerType::BloodPressureDiastolic)];
const BODY_TEMPERATURE: &[Candidate] = &[Candidate::biomarker(BiomarkerType::BodyTemperatureBasal)];
const FLOORS_CLIMBED: &[Candidate] = &[Candidate::biomarker(BiomarkerType::FloorsClimbed)];
const TOTAL_ENERGY_BURNED: &[Candidate] = &[Candidate::biomarker(BiomarkerType::TotalEnergyBurned)];
const EXERCISE_TIME: &[Candidate] = &[Candidate::biomarker(BiomarkerType::ExerciseTime)];
const WEIGHT: &[Candidate] = &[Candidate::biomarker(BiomarkerType::Weight)];
const HEIGHT: &[Candidate] = &[Candidate::biomarker(BiomarkerType::Height)];
const BMI: &[Candidate] = &[Candidate::biomarker(BiomarkerType::BodyMassIndex)];
const BODY_FAT: &[Candidate] = &[Candidate::biomarker(BiomarkerType::BodyFat)];
const LEAN_BODY_MASS: &[Candidate] = &[Candidate::biomarker(BiomarkerType::LeanMass)];
const SLEEP_EFFICIENCY: &[Candidate] = &[Candidate::biomarker(BiomarkerType::SleepEfficiency)];
const SLEEP_LATENCY: &[Candidate] = &[Candidate::biomarker(BiomarkerType::SleepLatency)];
const SLEEP_DEEP_DURATION: &[Candidate] = &[Candidate::biomarker(BiomarkerType::SleepDeepDuration)];
const SLEEP_REM_DURATION: &[Candidate] = &[Candidate::biomarker(BiomarkerType::SleepRemDuration)];
const SLEEP_LIGHT_DURATION: &[Candidate] =
    &[Candidate::biomarker(BiomarkerType::SleepLightDuration)];
const SLEEP_SCORE: &[Candidate] = &[Candidate::score(ScoreType::Sleep)];
const WELLBEING_SCORE: &[Candidate] = &[Candidate::score(ScoreType::Wellbeing)];
const ACTIVITY_SCORE: &[Candidate] = &[Candidate::score(ScoreType::Activity)];
const READINESS_SCORE: &[Candidate] = &[Candidate::score(ScoreType::Readiness)];

/// Resolution table covering every snapshot field
pub const FIELD_RULES: &[FieldRule] = &[
    // Vitals
    rule(SnapshotField::RestingHeartRate, RESTING_HEART_RATE),
    rule(SnapshotField::SleepHeartRate, SLEEP_HEART_RATE),
    rule(SnapshotField::HeartRateVariability, HEART_RATE_VARIABILITY),
    rule(SnapshotField::RespiratoryRate, RESPIRATORY_RATE),
    rule(SnapshotField::OxygenSaturation, OXYGEN_SATURATION),
    rule(SnapshotField::Vo2Max, VO2_MAX),
    rule(SnapshotField::BloodPressureSystolic, BLOOD_PRESSURE_SYSTOLIC),
    rule(SnapshotField::BloodPressureDiastolic, BLOOD_PRESSURE_DIASTOLIC),
    rule(SnapshotField::BodyTemperature, BODY_TEMPERATURE),
    // Activity
    rule(SnapshotField::Steps, STEPS),
    rule(SnapshotField::FloorsClimbed, FLOORS_CLIMBED),
    rule(SnapshotField::ActiveEnergyBurned, ACTIVE_ENERGY_BURNED),
    rule(SnapshotField::TotalEnergyBurned, TOTAL_ENERGY_BURNED),
    rule(SnapshotField::ActiveDuration, ACTIVE_DURATION),
    rule(SnapshotField::ExerciseTime, EXERCISE_TIME),
    // Body composition
    rule(SnapshotField::Weight, WEIGHT),
    rule(SnapshotField::Height, HEIGHT),
    rule(SnapshotField::Bmi, BMI),
    rule(SnapshotField::BodyFat, BODY_FAT),
    rule(SnapshotField::LeanBodyMass, LEAN_BODY_MASS),
    // Sleep
    ranged(
        SnapshotField::SleepDuration,
        SLEEP_DURATION,
        SLEEP_FACTOR_MINUTES.min * MINUTES,
        SLEEP_FACTOR_MINUTES.max * MINUTES,
    ),
    ranged(SnapshotField::SleepEfficiency, SLEEP_EFFICIENCY, 0.0, 100.0),
    ranged(SnapshotField::SleepLatency, SLEEP_LATENCY, 0.0, 7200.0),
    ranged(SnapshotField::SleepDeepDuration, SLEEP_DEEP_DURATION, 0.0, 28800.0),
    ranged(SnapshotField::SleepRemDuration, SLEEP_REM_DURATION, 0.0, 14400.0),
    ranged(SnapshotField::SleepLightDuration, SLEEP_LIGHT_DURATION, 0.0, 28800.0),
    // Wellness scores
    ranged(SnapshotField::SleepScore, SLEEP_SCORE, 0.0, 1.0),
    ranged(SnapshotField::WellbeingScore, WELLBEING_SCORE, 0.0, 1.0),
    ranged(SnapshotField::ActivityScore, ACTIVITY_SCORE, 0.0, 1.0),
    ranged(SnapshotField::ReadinessScore, READINESS_SCORE, 0.0, 1.0),
];

/// Look up the rule for a field
pub fn rule_for(field: SnapshotField) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|r| r.field == field)
}
