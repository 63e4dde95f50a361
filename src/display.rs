//! Human-readable rendering of snapshot values
//!
//! Score bands and value formatting used when presenting a snapshot, matching
//! how the fitness dashboard labels scores and durations.

use serde::Serialize;
use std::fmt;

/// Placeholder shown for a missing value
pub const NO_VALUE: &str = "--";

/// Qualitative band of a wellness score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
    NoData,
}

impl ScoreBand {
    /// Band for a score fraction in [0, 1]
    pub fn from_fraction(score: Option<f64>) -> Self {
        match score {
            Some(fraction) => Self::from_percent(fraction * 100.0),
            None => ScoreBand::NoData,
        }
    }

    /// Band for a score percentage
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 80.0 {
            ScoreBand::Excellent
        } else if percent >= 60.0 {
            ScoreBand::Good
        } else if percent >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::NeedsAttention
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::NeedsAttention => "Needs Attention",
            ScoreBand::NoData => "No Data",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-decimal value or `--`
pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => NO_VALUE.to_string(),
    }
}

/// Duration in seconds as `"{h}h {m}m"` or `--`; negative durations keep a leading `-`
pub fn format_duration_seconds(seconds: Option<f64>) -> String {
    match seconds {
        Some(secs) => {
            let total_minutes = (secs / 60.0).round() as i64;
            let sign = if total_minutes < 0 { "-" } else { "" };
            let minutes = total_minutes.unsigned_abs();
            format!("{}{}h {}m", sign, minutes / 60, minutes % 60)
        }
        None => NO_VALUE.to_string(),
    }
}

pub fn seconds_to_hours(seconds: Option<f64>) -> Option<f64> {
    seconds.map(|s| s / 3600.0)
}

pub fn minutes_to_hours(minutes: Option<f64>) -> Option<f64> {
    minutes.map(|m| m / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::from_fraction(Some(0.85)), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_fraction(Some(0.8)), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_fraction(Some(0.6)), ScoreBand::Good);
        assert_eq!(ScoreBand::from_fraction(Some(0.45)), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_fraction(Some(0.1)), ScoreBand::NeedsAttention);
        assert_eq!(ScoreBand::from_fraction(Some(0.0)), ScoreBand::NeedsAttention);
        assert_eq!(ScoreBand::from_fraction(None), ScoreBand::NoData);
        assert_eq!(ScoreBand::NoData.to_string(), "No Data");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(62.0), 0), "62");
        assert_eq!(format_value(Some(97.456), 1), "97.5");
        assert_eq!(format_value(None, 2), "--");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_seconds(Some(28800.0)), "8h 0m");
        assert_eq!(format_duration_seconds(Some(27030.0)), "7h 31m");
        assert_eq!(format_duration_seconds(None), "--");
    }

    #[test]
    fn test_format_negative_duration() {
        assert_eq!(format_duration_seconds(Some(-120.0)), "-0h 2m");
        assert_eq!(format_duration_seconds(Some(-5400.0)), "-1h 30m");
        assert_eq!(format_duration_seconds(Some(-10.0)), "0h 0m");
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(seconds_to_hours(Some(5400.0)), Some(1.5));
        assert_eq!(minutes_to_hours(Some(90.0)), Some(1.5));
        assert_eq!(seconds_to_hours(None), None);
    }
}
