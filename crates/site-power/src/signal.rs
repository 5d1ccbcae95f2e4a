//! Signal readings from individual providers

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::record::ProviderReport;

/// Definite state reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Up,
    Down,
}

impl Status {
    /// Map a boolean "is reachable" answer
    pub fn from_up(is_up: bool) -> Self {
        if is_up {
            Status::Up
        } else {
            Status::Down
        }
    }

    /// Classify a monitoring-platform sensor status string.
    ///
    /// `Up`, `Unusual` and `Warning` mean the device answers; `Down...`
    /// (including acknowledged variants) means it does not. Anything else,
    /// such as `Paused`, is not evidence either way.
    pub fn from_sensor_status(raw: &str) -> Result<Self, Unknown> {
        const UP: [&str; 3] = ["Up", "Unusual", "Warning"];

        if UP.iter().any(|prefix| raw.starts_with(prefix)) {
            Ok(Status::Up)
        } else if raw.starts_with("Down") {
            Ok(Status::Down)
        } else {
            warn!("Unrecognized sensor status '{}'", raw);
            Err(Unknown::new(format!("unrecognized status '{}'", raw)))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "Up",
            Status::Down => "Down",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider could not give a definite answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unknown {
    pub reason: String,
}

impl Unknown {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ({})", self.reason)
    }
}

/// One device-level provider's answer, with the vendor's raw status text
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReading {
    pub status: Result<Status, Unknown>,
    /// Vendor status as displayed to operators (e.g. `Paused`)
    pub raw: Option<String>,
}

impl SignalReading {
    pub fn new(status: Result<Status, Unknown>) -> Self {
        Self { status, raw: None }
    }

    pub fn up() -> Self {
        Self::new(Ok(Status::Up))
    }

    pub fn down() -> Self {
        Self::new(Ok(Status::Down))
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::new(Err(Unknown::new(reason)))
    }

    /// Reading from a monitoring sensor; keeps the raw text for display
    pub fn from_sensor_status(raw: &str) -> Self {
        Self {
            status: Status::from_sensor_status(raw),
            raw: Some(raw.to_string()),
        }
    }

    /// Definite status, if any
    pub fn known(&self) -> Option<Status> {
        self.status.as_ref().ok().copied()
    }

    /// Text shown in alert properties; empty when nothing definite is known
    pub fn display(&self) -> String {
        match (&self.raw, &self.status) {
            (Some(raw), _) => raw.clone(),
            (None, Ok(status)) => status.to_string(),
            (None, Err(_)) => String::new(),
        }
    }
}

impl From<Result<Status, Unknown>> for SignalReading {
    fn from(status: Result<Status, Unknown>) -> Self {
        Self::new(status)
    }
}

/// Fixed set of readings collected for one site
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    /// Utility outage dataset
    pub utility: Result<ProviderReport, Unknown>,
    /// Ping sensor on the site's LTE probe device
    pub ping: SignalReading,
    /// Probe-health sensor
    pub probe: SignalReading,
    /// Wireless access point
    pub access_point: SignalReading,
    /// Cellular router
    pub router: SignalReading,
}

impl SignalSet {
    /// Utility provider reduced to a status
    pub fn utility_status(&self) -> Option<Status> {
        match &self.utility {
            Ok(ProviderReport::Active) => Some(Status::Up),
            Ok(ProviderReport::Inactive(_)) => Some(Status::Down),
            Err(_) => None,
        }
    }

    /// Device-level readings in a fixed order: ping, probe, access point, router
    pub fn devices(&self) -> [&SignalReading; 4] {
        [&self.ping, &self.probe, &self.access_point, &self.router]
    }
}

impl Default for SignalSet {
    fn default() -> Self {
        Self {
            utility: Err(Unknown::new("not collected")),
            ping: SignalReading::unknown("not collected"),
            probe: SignalReading::unknown("not collected"),
            access_point: SignalReading::unknown("not collected"),
            router: SignalReading::unknown("not collected"),
        }
    }
}
