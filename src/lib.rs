//! Health Snapshot - normalized health metrics from an external biometrics provider
//!
//! The aggregator fans out a fixed set of biomarker queries and one scores
//! query for a time window, reconciles the two channels the provider exposes
//! (raw biomarkers and score factors), rejects implausible values and returns
//! one immutable [`HealthSnapshot`].
//!
//! ## Modules
//!
//! - **Aggregation**: [`HealthSnapshotAggregator`] drives session setup and the query fan-out
//! - **Reconciliation**: [`Reconciler`] applies the field rules to raw readings
//! - **Providers**: [`BiometricProvider`] seam, callback bridge and JSON fixtures

pub mod aggregator;
pub mod config;
pub mod display;
pub mod encoder;
pub mod error;
pub mod provider;
pub mod query;
pub mod reconcile;
pub mod rules;
pub mod types;

pub use aggregator::HealthSnapshotAggregator;
pub use config::AggregatorConfig;
pub use error::{ProviderError, SnapshotError};
pub use provider::{BiometricProvider, CallbackBridge, CallbackSdk, FixtureProvider};
pub use reconcile::{RawReadings, Reconciler, SnapshotReport};
pub use types::{HealthSnapshot, QueryWindow, SnapshotField};

/// Crate version embedded in snapshot envelopes
pub const SNAPSHOT_CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshot envelopes
pub const PRODUCER_NAME: &str = "health-snapshot";
