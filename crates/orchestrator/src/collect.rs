//! Signal collection
//!
//! The five lookups run concurrently, each under its own timeout. Whatever
//! goes wrong in a lookup ends up as an `Unknown` reading; collection itself
//! cannot fail.

use site_power::{
    CollaboratorError, ConfigurationItem, ProviderReport, SignalReading, SignalSet, Site, Status, Unknown,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::Collaborators;

/// Monitoring sensor and the device name part that identifies it at a site
const PING_SENSOR: (&str, &str) = ("Ping", "PI - LTE");
const PROBE_SENSOR: (&str, &str) = ("Probe Health", "Probe Device");

/// Gathers one [`SignalSet`] per site
pub struct SignalCollector<'a> {
    collaborators: &'a Collaborators,
    timeout: Duration,
}

impl<'a> SignalCollector<'a> {
    pub fn new(collaborators: &'a Collaborators, timeout: Duration) -> Self {
        Self {
            collaborators,
            timeout,
        }
    }

    pub async fn collect(&self, site: &Site) -> SignalSet {
        let (utility, ping, probe, access_point, router) = tokio::join!(
            self.utility(site),
            self.sensor(PING_SENSOR, site),
            self.sensor(PROBE_SENSOR, site),
            self.access_point(site),
            self.router(site),
        );

        SignalSet {
            utility,
            ping,
            probe,
            access_point,
            router,
        }
    }

    /// Run one lookup under the collection timeout
    async fn bounded<T, F>(&self, what: &str, lookup: F) -> Result<T, Unknown>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match timeout(self.timeout, lookup).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("{} lookup failed: {}", what, e);
                Err(Unknown::new(e.to_string()))
            }
            Err(_) => {
                warn!("{} lookup timed out after {:?}", what, self.timeout);
                Err(Unknown::new(format!("timed out after {:?}", self.timeout)))
            }
        }
    }

    async fn utility(&self, site: &Site) -> Result<ProviderReport, Unknown> {
        info!("Checking utility dataset for outages");
        self.bounded("Utility outage", self.collaborators.utility.status(site))
            .await
    }

    async fn sensor(&self, (kind, device): (&str, &str), site: &Site) -> SignalReading {
        info!("Checking {} sensor", kind);
        let name_parts = [site.name.as_str(), device];
        let lookup = self.collaborators.monitoring.sensors_by_name(kind, &name_parts);
        let sensors = match self.bounded(kind, lookup).await {
            Ok(sensors) => sensors,
            Err(unknown) => return SignalReading::new(Err(unknown)),
        };

        match sensors.as_slice() {
            [only] => match only.status.as_deref() {
                Some(raw) => SignalReading::from_sensor_status(raw),
                None => {
                    error!("Could not parse {} sensor status", kind);
                    SignalReading::unknown("sensor has no status")
                }
            },
            [] => {
                error!("Could not find {} sensor", kind);
                SignalReading::unknown("no matching sensor")
            }
            several => {
                error!("More than one {} sensor was found", kind);
                SignalReading::unknown(format!("{} matching sensors", several.len()))
            }
        }
    }

    async fn access_point(&self, site: &Site) -> SignalReading {
        info!("Checking status of access point");
        self.bounded("Access point", self.access_point_up(site))
            .await
            .map(Status::from_up)
            .into()
    }

    /// CMDB access point, then its serial, then its status
    async fn access_point_up(&self, site: &Site) -> Result<bool, CollaboratorError> {
        let cis = self.collaborators.directory.access_points_at(&site.name).await?;
        let ap = cis
            .into_iter()
            .find(|ci| ci.name.to_lowercase().contains("meraki"))
            .ok_or_else(|| CollaboratorError::NotFound(format!("Meraki access point at {}", site.name)))?;

        let serial = match ap.serial_number.as_deref().filter(|s| !s.is_empty()) {
            Some(serial) => serial.to_string(),
            None => self.access_point_serial(&ap).await?,
        };
        self.collaborators.access_points.device_status(&serial).await
    }

    /// Serial for an access point the CMDB has no serial for: by MAC, else by name
    async fn access_point_serial(&self, ap: &ConfigurationItem) -> Result<String, CollaboratorError> {
        let manager = &self.collaborators.access_points;
        let by_mac = match ap.mac_address.as_deref().filter(|m| !m.is_empty()) {
            Some(mac) => manager.device_by_mac(mac).await,
            None => Err(CollaboratorError::NotFound(format!("MAC address of {}", ap.name))),
        };

        let device = match by_mac {
            Ok(device) => device,
            Err(e) if e.is_not_found() => manager.device_by_name(&ap.name).await?,
            Err(e) => return Err(e),
        };
        Ok(device.serial)
    }

    async fn router(&self, site: &Site) -> SignalReading {
        info!("Checking status of cellular router");
        self.bounded("Router", self.collaborators.routers.router_status_by_name(&site.name))
            .await
            .map(Status::from_up)
            .into()
    }
}
