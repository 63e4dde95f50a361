//! Configuration file handling.
//!
//! Aggregator settings are read from a TOML file. Provider credentials can be
//! supplied or overridden through environment variables so secrets stay out of
//! the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SnapshotError;
use crate::types::{Credentials, Environment, Sensor};

/// Environment variable overriding `credentials.app_id`
pub const ENV_APP_ID: &str = "SNAPSHOT_APP_ID";
/// Environment variable overriding `credentials.app_secret`
pub const ENV_APP_SECRET: &str = "SNAPSHOT_APP_SECRET";
/// Environment variable overriding `credentials.external_id`
pub const ENV_EXTERNAL_ID: &str = "SNAPSHOT_EXTERNAL_ID";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Provider environment.
    #[serde(default)]
    pub environment: Environment,

    /// Sensors enabled after session setup.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<Sensor>,

    /// Credentials for an authenticated session. Absent means local-sensor-only mode.
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            sensors: default_sensors(),
            credentials: None,
        }
    }
}

fn default_sensors() -> Vec<Sensor> {
    vec![
        Sensor::Sleep,
        Sensor::StepCount,
        Sensor::FloorCount,
        Sensor::HeartRate,
        Sensor::RestingHeartRate,
        Sensor::HeartRateVariability,
        Sensor::ActiveEnergyBurned,
        Sensor::TotalEnergyBurned,
        Sensor::ExerciseTime,
        Sensor::RespiratoryRate,
        Sensor::OxygenSaturation,
        Sensor::Vo2Max,
        Sensor::BloodPressure,
        Sensor::BodyTemperature,
        Sensor::Weight,
        Sensor::Height,
        Sensor::BodyMassIndex,
        Sensor::BodyFat,
        Sensor::LeanBodyMass,
    ]
}

impl AggregatorConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SnapshotError> {
        toml::from_str(content).map_err(|e| SnapshotError::Config(e.to_string()))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a file if given, otherwise defaults; then apply environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, SnapshotError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply credential overrides from a variable lookup.
    ///
    /// A partial override only takes effect when the result has all three values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let current = self.credentials.clone();
        let pick = |key: &str, existing: Option<String>| {
            lookup(key).filter(|v| !v.is_empty()).or(existing)
        };

        let app_id = pick(ENV_APP_ID, current.as_ref().map(|c| c.app_id.clone()));
        let app_secret = pick(ENV_APP_SECRET, current.as_ref().map(|c| c.app_secret.clone()));
        let external_id = pick(ENV_EXTERNAL_ID, current.as_ref().map(|c| c.external_id.clone()));

        if let (Some(app_id), Some(app_secret), Some(external_id)) = (app_id, app_secret, external_id)
        {
            self.credentials = Some(Credentials {
                app_id,
                app_secret,
                external_id,
            });
        }
    }

    /// Whether the session runs without authentication.
    pub fn is_local_only(&self) -> bool {
        self.credentials.is_none()
    }

    /// Generate a default configuration file with comments.
    pub fn default_toml() -> String {
        r#"# health-snapshot configuration

# Provider environment: "sandbox" or "production"
environment = "sandbox"

# Sensors enabled after session setup
sensors = [
    "sleep",
    "step_count",
    "floor_count",
    "heart_rate",
    "resting_heart_rate",
    "heart_rate_variability",
    "active_energy_burned",
    "total_energy_burned",
    "exercise_time",
    "respiratory_rate",
    "oxygen_saturation",
    "vo2_max",
    "blood_pressure",
    "body_temperature",
    "weight",
    "height",
    "body_mass_index",
    "body_fat",
    "lean_body_mass",
]

# Omit this table to run in local-sensor-only mode.
# Values can also come from SNAPSHOT_APP_ID, SNAPSHOT_APP_SECRET and
# SNAPSHOT_EXTERNAL_ID.
# [credentials]
# app_id = ""
# app_secret = ""
# external_id = ""
"#
        .to_string()
    }
}
