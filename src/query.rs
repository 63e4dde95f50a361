//! Biomarker query plan
//!
//! This module defines the fixed set of biomarker queries issued per window and
//! how each query's samples collapse into a single value:
//! - `last`: most recent sample
//! - `sum`: total across the window
//! - `avg`: mean across the window

use serde::{Deserialize, Serialize};

use crate::types::{BiomarkerCategory, BiomarkerSample, BiomarkerType};

/// How the samples of one biomarker query are reduced to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Last,
    Sum,
    Avg,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Last => "last",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
        }
    }

    /// Reduce samples to one value. Returns `None` when no finite sample exists.
    pub fn reduce(&self, samples: &[BiomarkerSample]) -> Option<f64> {
        let finite = samples.iter().filter(|s| s.value.is_finite());

        match self {
            // max_by_key keeps the later element on equal timestamps
            Aggregation::Last => finite.max_by_key(|s| s.timestamp).map(|s| s.value),
            Aggregation::Sum => {
                let (count, total) = finite.fold((0usize, 0.0), |(n, acc), s| (n + 1, acc + s.value));
                (count > 0).then_some(total)
            }
            Aggregation::Avg => {
                let (count, total) = finite.fold((0usize, 0.0), |(n, acc), s| (n + 1, acc + s.value));
                (count > 0).then(|| total / count as f64)
            }
        }
    }
}

/// One entry of the query plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiomarkerQuery {
    pub biomarker: BiomarkerType,
    pub category: BiomarkerCategory,
    pub aggregation: Aggregation,
}

const fn query(
    biomarker: BiomarkerType,
    category: BiomarkerCategory,
    aggregation: Aggregation,
) -> BiomarkerQuery {
    BiomarkerQuery {
        biomarker,
        category,
        aggregation,
    }
}

/// Biomarker queries issued for every aggregation window
pub const QUERY_PLAN: &[BiomarkerQuery] = &[
    // Vitals
    query(BiomarkerType::RestingHeartRate, BiomarkerCategory::Vitals, Aggregation::Avg),
    query(BiomarkerType::HeartRateSleep, BiomarkerCategory::Vitals, Aggregation::Avg),
    query(BiomarkerType::HeartRateVariabilitySdnn, BiomarkerCategory::Vitals, Aggregation::Avg),
    query(BiomarkerType::RespiratoryRate, BiomarkerCategory::Vitals, Aggregation::Avg),
    query(BiomarkerType::OxygenSaturation, BiomarkerCategory::Vitals, Aggregation::Avg),
    query(BiomarkerType::Vo2Max, BiomarkerCategory::Vitals, Aggregation::Last),
    query(BiomarkerType::BloodPressureSystolic, BiomarkerCategory::Vitals, Aggregation::Last),
    query(BiomarkerType::BloodPressureDiastolic, BiomarkerCategory::Vitals, Aggregation::Last),
    query(BiomarkerType::BodyTemperatureBasal, BiomarkerCategory::Vitals, Aggregation::Last),
    // Activity
    query(BiomarkerType::Steps, BiomarkerCategory::Activity, Aggregation::Sum),
    query(BiomarkerType::FloorsClimbed, BiomarkerCategory::Activity, Aggregation::Sum),
    query(BiomarkerType::ActiveEnergyBurned, BiomarkerCategory::Activity, Aggregation::Sum),
    query(BiomarkerType::TotalEnergyBurned, BiomarkerCategory::Activity, Aggregation::Sum),
    query(BiomarkerType::ActiveDuration, BiomarkerCategory::Activity, Aggregation::Sum),
    query(BiomarkerType::ExerciseTime, BiomarkerCategory::Activity, Aggregation::Sum),
    // Body composition
    query(BiomarkerType::Weight, BiomarkerCategory::Body, Aggregation::Last),
    query(BiomarkerType::Height, BiomarkerCategory::Body, Aggregation::Last),
    query(BiomarkerType::BodyMassIndex, BiomarkerCategory::Body, Aggregation::Last),
    query(BiomarkerType::BodyFat, BiomarkerCategory::Body, Aggregation::Last),
    query(BiomarkerType::LeanMass, BiomarkerCategory::Body, Aggregation::Last),
    // Sleep
    query(BiomarkerType::SleepDuration, BiomarkerCategory::Sleep, Aggregation::Sum),
    query(BiomarkerType::SleepEfficiency, BiomarkerCategory::Sleep, Aggregation::Avg),
    query(BiomarkerType::SleepLatency, BiomarkerCategory::Sleep, Aggregation::Avg),
    query(BiomarkerType::SleepDeepDuration, BiomarkerCategory::Sleep, Aggregation::Sum),
    query(BiomarkerType::SleepRemDuration, BiomarkerCategory::Sleep, Aggregation::Sum),
    query(BiomarkerType::SleepLightDuration, BiomarkerCategory::Sleep, Aggregation::Sum),
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn samples(values: &[f64]) -> Vec<BiomarkerSample> {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| BiomarkerSample {
                value: *v,
                timestamp: base + Duration::hours(i as i64),
            })
            .collect()
    }

    #[test]
    fn test_reduce_modes() {
        let s = samples(&[100.0, 250.0]);

        assert_eq!(Aggregation::Sum.reduce(&s), Some(350.0));
        assert_eq!(Aggregation::Avg.reduce(&s), Some(175.0));
        assert_eq!(Aggregation::Last.reduce(&s), Some(250.0));
    }

    #[test]
    fn test_reduce_empty_is_none() {
        assert_eq!(Aggregation::Sum.reduce(&[]), None);
        assert_eq!(Aggregation::Avg.reduce(&[]), None);
        assert_eq!(Aggregation::Last.reduce(&[]), None);
    }

    #[test]
    fn test_last_uses_timestamp_not_position() {
        let mut s = samples(&[10.0, 20.0, 30.0]);
        s.swap(0, 2);

        assert_eq!(Aggregation::Last.reduce(&s), Some(30.0));
    }

    #[test]
    fn test_last_prefers_later_sample_on_equal_timestamps() {
        let mut s = samples(&[10.0, 20.0]);
        s[1].timestamp = s[0].timestamp;

        assert_eq!(Aggregation::Last.reduce(&s), Some(20.0));
    }

    #[test]
    fn test_non_finite_samples_are_ignored() {
        let s = samples(&[f64::NAN, 40.0, f64::INFINITY]);

        assert_eq!(Aggregation::Sum.reduce(&s), Some(40.0));
        assert_eq!(Aggregation::Avg.reduce(&s), Some(40.0));
        assert_eq!(Aggregation::Last.reduce(&samples(&[f64::NAN])), None);
    }

    #[test]
    fn test_query_plan_has_unique_biomarkers() {
        let unique: HashSet<_> = QUERY_PLAN.iter().map(|q| q.biomarker).collect();

        assert_eq!(unique.len(), QUERY_PLAN.len());
        assert_eq!(QUERY_PLAN.len(), 26);
    }
}
