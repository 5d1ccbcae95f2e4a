//! Site, device and ticket records exchanged with collaborators

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Geographic point in WGS84
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

/// Physical location record from the site directory
///
/// Longitude and latitude are held together so a site can never carry only
/// one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Directory identifier
    pub id: String,
    /// Display name, also used to look up devices and sensors
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Resolved location, `None` until geocoded
    pub coordinates: Option<Coordinates>,
}

impl Site {
    /// Single-line postal address used for geocoding
    pub fn address(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }

    /// Street, city and state, without the zip code
    pub fn short_address(&self) -> String {
        format!("{}, {}, {}", self.street, self.city, self.state)
    }
}

/// One sensor row returned by the network monitoring platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    pub name: String,
    pub device: String,
    /// Raw status text, e.g. `Up`, `Down (Acknowledged)`, `Paused`
    pub status: Option<String>,
}

/// Access point as known by the wireless management platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub name: Option<String>,
    pub mac: Option<String>,
}

/// Configuration item from the ITSM CMDB
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub id: String,
    pub name: String,
    pub serial_number: Option<String>,
    pub mac_address: Option<String>,
    pub warranty_expiration: Option<NaiveDate>,
    /// Reference to the manufacturer record, resolved through the ITSM
    pub manufacturer_link: Option<String>,
}

/// Fields of an incident to be filed in the ITSM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIncident {
    pub company: String,
    pub caller: String,
    pub opened_by: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub location: String,
    /// Configuration item the incident is about, if any
    pub configuration_item: Option<String>,
}

/// Incident created in the ITSM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub link: String,
}
