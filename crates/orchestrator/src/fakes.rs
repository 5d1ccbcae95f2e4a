//! In-memory collaborators
//!
//! [`World`] plays every external system at once and records each call, so
//! tests can assert on what the orchestrator did and in which order.

use async_trait::async_trait;
use chrono::NaiveDate;
use site_power::ports::{
    AccessPointManager, AlertingPlatform, Geocoder, MonitoringPlatform, RouterManager, SiteDirectory,
    SocialFeed, Ticketing, UtilityOutageProvider, WarrantyLookup, ACCEPTED,
};
use site_power::{
    Alert, AlertWebhook, CollaboratorError, ConfigurationItem, Coordinates, Device, ExtraProperties,
    GeocodeError, Incident, NewIncident, ProviderReport, SensorReading, Site,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::Collaborators;

pub const SITE_NAME: &str = "Fresno 12";

pub fn site() -> Site {
    Site {
        id: "a1b2c3".to_string(),
        name: SITE_NAME.to_string(),
        street: "100 Main St".to_string(),
        city: "Fresno".to_string(),
        state: "CA".to_string(),
        zip: "93721".to_string(),
        coordinates: Some(Coordinates {
            longitude: -119.78,
            latitude: 36.74,
        }),
    }
}

pub fn sensor(kind: &str, status: &str) -> SensorReading {
    SensorReading {
        id: 2041,
        name: kind.to_string(),
        device: format!("{} PI - LTE", SITE_NAME),
        status: Some(status.to_string()),
    }
}

/// Webhook for the test site with the given alert priority
pub fn webhook(priority: &str) -> AlertWebhook {
    AlertWebhook {
        alert: Alert {
            id: "70413a06-38d6-4c85-92b8-5ebc900d42e2".to_string(),
            message: "Site Fresno 12 unreachable".to_string(),
            description: "Ping sensor down for 5 minutes".to_string(),
            priority: priority.to_string(),
            tags: vec!["network".to_string()],
            extra_properties: ExtraProperties {
                group: SITE_NAME.to_string(),
                device: "fresno12-meraki-ap01".to_string(),
                sensor_id: None,
            },
            tiny_id: None,
            alias: None,
            source: None,
            entity: None,
            status: None,
        },
        action_name: "Check Site Power".to_string(),
        customer_name: None,
        timestamp: None,
    }
}

/// Every collaborator, backed by plain fields
pub struct World {
    pub site: Option<Site>,
    pub directory_error: Option<CollaboratorError>,
    pub geocode: Result<Coordinates, GeocodeError>,
    pub utility: Result<ProviderReport, CollaboratorError>,
    pub ping: Result<Vec<SensorReading>, CollaboratorError>,
    pub probe: Result<Vec<SensorReading>, CollaboratorError>,
    pub access_points: Vec<ConfigurationItem>,
    pub devices: Vec<Device>,
    pub access_point_up: Result<bool, CollaboratorError>,
    pub router_up: Result<bool, CollaboratorError>,
    /// Delay before the router answers
    pub router_delay: Option<Duration>,
    pub incident_error: Option<CollaboratorError>,
    pub panic_on_incident: bool,
    /// Status code returned by every alerting call
    pub alerting_status: u16,
    /// Delay before a close call completes; only completed closes are recorded
    pub close_delay: Option<Duration>,
    pub manufacturer: String,
    pub cis: Vec<ConfigurationItem>,
    pub warranty_end: Option<NaiveDate>,

    calls: Mutex<Vec<String>>,
    pub incidents: Mutex<Vec<NewIncident>>,
    pub posts: Mutex<Vec<String>>,
    pub details: Mutex<Vec<Vec<(String, String)>>>,
    pub tags: Mutex<Vec<String>>,
}

impl World {
    /// A located site where every signal reports Up
    pub fn healthy() -> Self {
        Self {
            site: Some(site()),
            directory_error: None,
            geocode: Ok(Coordinates {
                longitude: -119.78,
                latitude: 36.74,
            }),
            utility: Ok(ProviderReport::Active),
            ping: Ok(vec![sensor("Ping", "Up")]),
            probe: Ok(vec![sensor("Probe Health", "Up")]),
            access_points: vec![ConfigurationItem {
                id: "ci-ap01".to_string(),
                name: "fresno12-Meraki-AP01".to_string(),
                serial_number: Some("Q2XX-AAAA-BBBB".to_string()),
                ..Default::default()
            }],
            devices: Vec::new(),
            access_point_up: Ok(true),
            router_up: Ok(true),
            router_delay: None,
            incident_error: None,
            panic_on_incident: false,
            alerting_status: ACCEPTED,
            close_delay: None,
            manufacturer: "Cisco".to_string(),
            cis: Vec::new(),
            warranty_end: None,
            calls: Mutex::new(Vec::new()),
            incidents: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            details: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
        }
    }

    /// A located site where every signal reports Down
    pub fn blacked_out() -> Self {
        Self {
            utility: Ok(ProviderReport::Inactive(site_power::OutageDetail {
                start_date: Some("2024-06-01 10:15:00".to_string()),
                outage_type: Some("Unplanned".to_string()),
                cause: Some("Equipment Failure".to_string()),
                ..Default::default()
            })),
            ping: Ok(vec![sensor("Ping", "Down")]),
            probe: Ok(vec![sensor("Probe Health", "Down (Acknowledged)")]),
            access_point_up: Ok(false),
            router_up: Ok(false),
            ..Self::healthy()
        }
    }

    /// Share this world as every collaborator
    pub fn into_collaborators(self) -> (Arc<World>, Collaborators) {
        let world = Arc::new(self);
        let collaborators = Collaborators {
            directory: world.clone(),
            ticketing: world.clone(),
            geocoder: world.clone(),
            utility: world.clone(),
            monitoring: world.clone(),
            access_points: world.clone(),
            routers: world.clone(),
            alerting: world.clone(),
            social: world.clone(),
            warranty: Some(world.clone()),
        };
        (world, collaborators)
    }

    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.to_string());
        }
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn called(&self, call: &str) -> bool {
        self.count(call) > 0
    }
}

#[async_trait]
impl SiteDirectory for World {
    async fn site_by_name(&self, name: &str) -> Result<Site, CollaboratorError> {
        self.record("site_by_name");
        if let Some(err) = &self.directory_error {
            return Err(err.clone());
        }
        self.site
            .clone()
            .filter(|s| s.name == name)
            .ok_or_else(|| CollaboratorError::NotFound(name.to_string()))
    }

    async fn set_coordinates(&self, _site_id: &str, coordinates: Coordinates) -> Result<Site, CollaboratorError> {
        self.record("set_coordinates");
        let mut site = self
            .site
            .clone()
            .ok_or_else(|| CollaboratorError::NotFound("site".to_string()))?;
        site.coordinates = Some(coordinates);
        Ok(site)
    }

    async fn access_points_at(&self, _site_name: &str) -> Result<Vec<ConfigurationItem>, CollaboratorError> {
        self.record("access_points_at");
        Ok(self.access_points.clone())
    }
}

#[async_trait]
impl Ticketing for World {
    async fn create_incident(&self, incident: &NewIncident) -> Result<Incident, CollaboratorError> {
        self.record("create_incident");
        if self.panic_on_incident {
            panic!("ticketing client crashed");
        }
        if let Some(err) = &self.incident_error {
            return Err(err.clone());
        }
        let mut incidents = self
            .incidents
            .lock()
            .map_err(|_| CollaboratorError::Unavailable("incidents"))?;
        incidents.push(incident.clone());
        Ok(Incident {
            id: format!("INC00{}", incidents.len()),
            link: format!("https://itsm.example/incident?sys_id={}", incidents.len()),
        })
    }

    async fn record_name(&self, _link: &str) -> Result<String, CollaboratorError> {
        self.record("record_name");
        Ok(self.manufacturer.clone())
    }

    async fn set_field(&self, _ci_id: &str, name: &str, _value: &str) -> Result<(), CollaboratorError> {
        self.record(&format!("set_field:{}", name));
        Ok(())
    }

    async fn ci_by_name(&self, name: &str) -> Result<ConfigurationItem, CollaboratorError> {
        self.record("ci_by_name");
        self.cis
            .iter()
            .find(|ci| ci.name == name)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl Geocoder for World {
    async fn resolve(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        self.record("resolve");
        self.geocode.clone()
    }
}

#[async_trait]
impl UtilityOutageProvider for World {
    async fn status(&self, _site: &Site) -> Result<ProviderReport, CollaboratorError> {
        self.record("utility_status");
        self.utility.clone()
    }
}

#[async_trait]
impl MonitoringPlatform for World {
    async fn sensors_by_name(&self, sensor: &str, _name_parts: &[&str]) -> Result<Vec<SensorReading>, CollaboratorError> {
        self.record(&format!("sensors:{}", sensor));
        match sensor {
            "Ping" => self.ping.clone(),
            _ => self.probe.clone(),
        }
    }
}

#[async_trait]
impl AccessPointManager for World {
    async fn device_by_mac(&self, mac: &str) -> Result<Device, CollaboratorError> {
        self.record("device_by_mac");
        self.devices
            .iter()
            .find(|d| d.mac.as_deref() == Some(mac))
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(mac.to_string()))
    }

    async fn device_by_name(&self, name: &str) -> Result<Device, CollaboratorError> {
        self.record("device_by_name");
        self.devices
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(name.to_string()))
    }

    async fn device_status(&self, serial: &str) -> Result<bool, CollaboratorError> {
        self.record(&format!("device_status:{}", serial));
        self.access_point_up.clone()
    }
}

#[async_trait]
impl RouterManager for World {
    async fn router_status_by_name(&self, _name: &str) -> Result<bool, CollaboratorError> {
        self.record("router_status");
        if let Some(delay) = self.router_delay {
            tokio::time::sleep(delay).await;
        }
        self.router_up.clone()
    }
}

#[async_trait]
impl AlertingPlatform for World {
    async fn add_details(&self, _alert_id: &str, details: &[(&str, String)], _note: &str) -> Result<u16, CollaboratorError> {
        self.record("add_details");
        if let Ok(mut posted) = self.details.lock() {
            posted.push(details.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());
        }
        Ok(self.alerting_status)
    }

    async fn add_tags(&self, _alert_id: &str, tags: &[&str], _note: &str) -> Result<u16, CollaboratorError> {
        self.record("add_tags");
        if let Ok(mut added) = self.tags.lock() {
            added.extend(tags.iter().map(|t| t.to_string()));
        }
        Ok(self.alerting_status)
    }

    async fn close_alert(&self, _alert_id: &str, _note: &str) -> Result<u16, CollaboratorError> {
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("close_alert");
        Ok(self.alerting_status)
    }
}

#[async_trait]
impl SocialFeed for World {
    async fn post_update(&self, text: &str) -> Result<(), CollaboratorError> {
        self.record("post_update");
        if let Ok(mut posts) = self.posts.lock() {
            posts.push(text.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl WarrantyLookup for World {
    async fn coverage_end_date(&self, _serial: &str) -> Result<Option<NaiveDate>, CollaboratorError> {
        self.record("coverage_end_date");
        Ok(self.warranty_end)
    }
}
