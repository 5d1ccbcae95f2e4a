//! Outage Aggregator
//!
//! Folds the collected signals into a single verdict. Evaluated in order:
//! 1. Any device-level provider Up            -> Up
//! 2. Utility Up, every device Unknown        -> Likely Up
//! 3. Utility Up, some device Down            -> Likely Down
//! 4. Otherwise (utility Down or Unknown)     -> Down
//!
//! A single positive signal wins over any number of negative ones. Unknown
//! never counts as Down evidence for a device.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::model::Site;
use crate::record::{OutageRecord, ProviderReport};
use crate::signal::{SignalSet, Status};

/// Aggregate power verdict for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    Up,
    #[serde(rename = "Likely Up")]
    LikelyUp,
    #[serde(rename = "Likely Down")]
    LikelyDown,
    Down,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Up => "Up",
            Verdict::LikelyUp => "Likely Up",
            Verdict::LikelyDown => "Likely Down",
            Verdict::Down => "Down",
        }
    }

    /// Whether the verdict calls for an outage ticket
    pub fn is_outage(&self) -> bool {
        matches!(self, Verdict::Down)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the verdict from the utility status and the device-level statuses
pub fn decide(utility: Option<Status>, devices: &[Option<Status>]) -> Verdict {
    if devices.iter().any(|d| *d == Some(Status::Up)) {
        info!("At least one sensor/device is up: not a power outage");
        return Verdict::Up;
    }

    if utility == Some(Status::Up) {
        if devices.iter().all(Option::is_none) {
            info!("Could not retrieve device data but provider suggests no outage");
            Verdict::LikelyUp
        } else {
            info!("Provider reports no outage but device data suggests one");
            Verdict::LikelyDown
        }
    } else {
        info!("No sensor/device is up and provider does not rule out an outage");
        Verdict::Down
    }
}

/// Build the outage record for a site from its collected signals
pub fn aggregate(site: &Site, signals: SignalSet) -> OutageRecord {
    let devices: Vec<Option<Status>> = signals.devices().iter().map(|r| r.known()).collect();
    let utility = signals.utility_status();

    for (name, reading) in ["ping", "probe", "access point", "router"]
        .iter()
        .zip(signals.devices())
    {
        if let Err(unknown) = &reading.status {
            debug!("{} signal for {} is {}", name, site.name, unknown);
        }
    }

    let verdict = decide(utility, &devices);

    let outage = match &signals.utility {
        Ok(ProviderReport::Inactive(detail)) => Some(detail.clone()),
        _ => None,
    };

    OutageRecord {
        site_name: site.name.clone(),
        provider_status: utility.map(|s| s.to_string()).unwrap_or_default(),
        outage,
        ping_status: signals.ping.display(),
        probe_status: signals.probe.display(),
        access_point_status: signals.access_point.display(),
        router_status: signals.router.display(),
        verdict,
    }
}
