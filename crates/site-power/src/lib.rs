//! Site Power
//!
//! Decides whether a site is experiencing a power outage from independent,
//! partially unreliable monitoring signals:
//! - Utility outage dataset (geospatial)
//! - Ping and probe-health sensors (network monitoring)
//! - Wireless access point status
//! - Cellular router status
//!
//! Also provides the warranty checker, the alert priority to ticket severity
//! table, and the contracts every external collaborator must honor.

mod aggregator;
mod alert;
mod error;
mod model;
pub mod ports;
mod record;
mod severity;
mod signal;
mod warranty;

pub use aggregator::{aggregate, decide, Verdict};
pub use alert::{Alert, AlertWebhook, ExtraProperties};
pub use error::{CollaboratorError, GeocodeError};
pub use model::{ConfigurationItem, Coordinates, Device, Incident, NewIncident, SensorReading, Site};
pub use record::{OutageDetail, OutageRecord, ProviderReport};
pub use severity::{Severity, UnknownPriority};
pub use signal::{SignalReading, SignalSet, Status, Unknown};
pub use warranty::{days_overdue, WarrantyCheckResult, WarrantyChecker};

/// Verdict key used when the record is flattened into alert properties
pub const VERDICT_KEY: &str = "Power_SitePower";
