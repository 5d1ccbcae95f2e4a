//! Collaborator contracts
//!
//! Every external system the service talks to sits behind one of these
//! traits. Implementations own their transport, credentials and rate limits.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{CollaboratorError, GeocodeError};
use crate::model::{ConfigurationItem, Coordinates, Device, Incident, NewIncident, SensorReading, Site};
use crate::record::ProviderReport;

/// Site records held by the ITSM location table and CMDB
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// Fails with [`CollaboratorError::NotFound`] when no site has this name
    async fn site_by_name(&self, name: &str) -> Result<Site, CollaboratorError>;

    /// Persist resolved coordinates and return the updated site
    async fn set_coordinates(
        &self,
        site_id: &str,
        coordinates: Coordinates,
    ) -> Result<Site, CollaboratorError>;

    /// Wireless access points the CMDB places at a site
    async fn access_points_at(
        &self,
        site_name: &str,
    ) -> Result<Vec<ConfigurationItem>, CollaboratorError>;
}

/// ITSM ticketing and CMDB write access
#[async_trait]
pub trait Ticketing: Send + Sync {
    async fn create_incident(&self, incident: &NewIncident) -> Result<Incident, CollaboratorError>;

    /// Display name of a referenced record (e.g. a manufacturer)
    async fn record_name(&self, link: &str) -> Result<String, CollaboratorError>;

    /// Update one field of a configuration item
    async fn set_field(&self, ci_id: &str, name: &str, value: &str) -> Result<(), CollaboratorError>;

    async fn ci_by_name(&self, name: &str) -> Result<ConfigurationItem, CollaboratorError>;
}

/// Address to coordinates resolution
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Geospatial utility outage dataset
#[async_trait]
pub trait UtilityOutageProvider: Send + Sync {
    async fn status(&self, site: &Site) -> Result<ProviderReport, CollaboratorError>;
}

/// Network monitoring platform
#[async_trait]
pub trait MonitoringPlatform: Send + Sync {
    /// Sensors named `sensor` whose device name contains every name part
    async fn sensors_by_name(
        &self,
        sensor: &str,
        name_parts: &[&str],
    ) -> Result<Vec<SensorReading>, CollaboratorError>;
}

/// Wireless access point management platform
#[async_trait]
pub trait AccessPointManager: Send + Sync {
    async fn device_by_mac(&self, mac: &str) -> Result<Device, CollaboratorError>;

    async fn device_by_name(&self, name: &str) -> Result<Device, CollaboratorError>;

    /// Whether the device with this serial is online
    async fn device_status(&self, serial: &str) -> Result<bool, CollaboratorError>;
}

/// Cellular router management platform
#[async_trait]
pub trait RouterManager: Send + Sync {
    /// Whether the router with this name is online
    async fn router_status_by_name(&self, name: &str) -> Result<bool, CollaboratorError>;
}

/// Alerting platform; every call answers with the HTTP status code, 202 is success
#[async_trait]
pub trait AlertingPlatform: Send + Sync {
    async fn add_details(
        &self,
        alert_id: &str,
        details: &[(&str, String)],
        note: &str,
    ) -> Result<u16, CollaboratorError>;

    async fn add_tags(&self, alert_id: &str, tags: &[&str], note: &str) -> Result<u16, CollaboratorError>;

    async fn close_alert(&self, alert_id: &str, note: &str) -> Result<u16, CollaboratorError>;
}

/// Public social feed
#[async_trait]
pub trait SocialFeed: Send + Sync {
    async fn post_update(&self, text: &str) -> Result<(), CollaboratorError>;
}

/// Vendor warranty records
#[async_trait]
pub trait WarrantyLookup: Send + Sync {
    /// Authoritative warranty end date for a serial number, if the vendor has one
    async fn coverage_end_date(&self, serial: &str) -> Result<Option<NaiveDate>, CollaboratorError>;
}

/// Status code the alerting platform returns for an accepted request
pub const ACCEPTED: u16 = 202;
