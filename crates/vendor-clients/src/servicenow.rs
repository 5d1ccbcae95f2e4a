//! ServiceNow Table API client
//!
//! Serves the site directory (`cmn_location`), the CMDB (`cmdb_ci`) and
//! incident filing (`incident`).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use site_power::ports::{SiteDirectory, Ticketing};
use site_power::{
    CollaboratorError, ConfigurationItem, Coordinates, Incident, NewIncident, Site,
};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::http::{trim_base, HttpSettings, RestClient};

fn default_access_point_class() -> String {
    "cmdb_ci_wap_network".to_string()
}

/// ServiceNow connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceNowConfig {
    /// Instance name, as in `<instance>.service-now.com`
    pub instance: String,
    pub username: String,
    pub password: String,
    /// Overrides the URL derived from the instance name
    #[serde(default)]
    pub base_url: Option<String>,
    /// CMDB class of wireless access points
    #[serde(default = "default_access_point_class")]
    pub access_point_class: String,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct TableResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    sys_id: String,
    name: String,
    #[serde(default)]
    street: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    zip: String,
    #[serde(default)]
    longitude: String,
    #[serde(default)]
    latitude: String,
}

impl From<LocationRecord> for Site {
    fn from(record: LocationRecord) -> Self {
        let coordinates = match (
            record.longitude.trim().parse::<f64>(),
            record.latitude.trim().parse::<f64>(),
        ) {
            (Ok(longitude), Ok(latitude)) => Some(Coordinates {
                longitude,
                latitude,
            }),
            _ => None,
        };

        Site {
            id: record.sys_id,
            name: record.name,
            street: record.street,
            city: record.city,
            state: record.state,
            zip: record.zip,
            coordinates,
        }
    }
}

/// Reference fields are either `""` or `{"link": ..., "value": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reference {
    Linked { link: String },
    Empty(String),
}

#[derive(Debug, Deserialize)]
struct CiRecord {
    sys_id: String,
    name: String,
    #[serde(default)]
    serial_number: String,
    #[serde(default)]
    mac_address: String,
    #[serde(default)]
    warranty_expiration: String,
    #[serde(default)]
    manufacturer: Option<Reference>,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<CiRecord> for ConfigurationItem {
    fn from(record: CiRecord) -> Self {
        let warranty_expiration = match record.warranty_expiration.trim() {
            "" => None,
            raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| warn!("Unparseable warranty date '{}' on {}: {}", raw, record.name, e))
                .ok(),
        };
        let manufacturer_link = match record.manufacturer {
            Some(Reference::Linked { link }) => Some(link),
            Some(Reference::Empty(_)) | None => None,
        };

        ConfigurationItem {
            id: record.sys_id,
            name: record.name,
            serial_number: non_empty(record.serial_number),
            mac_address: non_empty(record.mac_address),
            warranty_expiration,
            manufacturer_link,
        }
    }
}

#[derive(Debug, Serialize)]
struct IncidentPayload<'a> {
    company: &'a str,
    u_customer: &'a str,
    caller_id: &'a str,
    opened_by: &'a str,
    short_description: &'a str,
    description: &'a str,
    impact: u8,
    urgency: u8,
    severity: u8,
    location: &'a str,
    cmdb_ci: &'a str,
}

impl<'a> From<&'a NewIncident> for IncidentPayload<'a> {
    fn from(incident: &'a NewIncident) -> Self {
        let level = incident.severity.level();
        Self {
            company: &incident.company,
            u_customer: &incident.company,
            caller_id: &incident.caller,
            opened_by: &incident.opened_by,
            short_description: &incident.title,
            description: &incident.description,
            impact: level,
            urgency: level,
            severity: level,
            location: &incident.location,
            cmdb_ci: incident.configuration_item.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    sys_id: String,
    #[serde(default)]
    number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    name: String,
}

/// ServiceNow Table API client
pub struct ServiceNowClient {
    client: RestClient,
    base_url: String,
    username: String,
    password: String,
    access_point_class: String,
}

impl ServiceNowClient {
    pub fn new(config: &ServiceNowConfig) -> Result<Self, ClientError> {
        let base_url = match &config.base_url {
            Some(url) => trim_base(url),
            None => format!("https://{}.service-now.com", config.instance),
        };
        info!("Creating ServiceNow client for {}", base_url);

        Ok(Self {
            client: RestClient::new("servicenow", &config.http, HeaderMap::new())?,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            access_point_class: config.access_point_class.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/api/now/table/{}", self.base_url, table)
    }

    /// Browser link for an incident
    pub fn incident_link(&self, sys_id: &str) -> String {
        format!("{}/incident?sys_id={}", self.base_url, sys_id)
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<T>, CollaboratorError> {
        let mut params = vec![("sysparm_query", query.to_string())];
        if let Some(limit) = limit {
            params.push(("sysparm_limit", limit.to_string()));
        }

        let request = self
            .client
            .get(&self.table_url(table))
            .basic_auth(&self.username, Some(&self.password))
            .query(&params);
        let response: TableResponse<Vec<T>> = self.client.json(request).await?;
        Ok(response.result)
    }

    /// Exactly one record must match
    async fn one<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        query: &str,
        what: &str,
    ) -> Result<T, CollaboratorError> {
        let mut records = self.query::<T>(table, query, Some(2)).await?;
        match records.len() {
            0 => Err(CollaboratorError::NotFound(format!("Could not find {}", what))),
            1 => Ok(records.remove(0)),
            _ => Err(CollaboratorError::Ambiguous(format!("More than one {}", what))),
        }
    }

    async fn update<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        sys_id: &str,
        payload: serde_json::Value,
    ) -> Result<T, CollaboratorError> {
        let url = format!("{}/{}", self.table_url(table), sys_id);
        let request = self
            .client
            .patch(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload);
        let response: TableResponse<T> = self.client.json(request).await?;
        Ok(response.result)
    }
}

#[async_trait]
impl SiteDirectory for ServiceNowClient {
    async fn site_by_name(&self, name: &str) -> Result<Site, CollaboratorError> {
        let record: LocationRecord = self
            .one("cmn_location", &format!("name={}", name), &format!("site {}", name))
            .await?;
        Ok(record.into())
    }

    async fn set_coordinates(
        &self,
        site_id: &str,
        coordinates: Coordinates,
    ) -> Result<Site, CollaboratorError> {
        info!("Updating coordinates of location {} on the CMDB", site_id);
        let payload = json!({
            "longitude": coordinates.longitude.to_string(),
            "latitude": coordinates.latitude.to_string(),
        });
        let record: LocationRecord = self.update("cmn_location", site_id, payload).await?;
        Ok(record.into())
    }

    async fn access_points_at(
        &self,
        site_name: &str,
    ) -> Result<Vec<ConfigurationItem>, CollaboratorError> {
        let query = format!(
            "sys_class_name={}^location.name={}",
            self.access_point_class, site_name
        );
        let records: Vec<CiRecord> = self.query("cmdb_ci", &query, None).await?;
        debug!("Found {} access point(s) at {}", records.len(), site_name);
        Ok(records.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl Ticketing for ServiceNowClient {
    async fn create_incident(&self, incident: &NewIncident) -> Result<Incident, CollaboratorError> {
        let request = self
            .client
            .post(&self.table_url("incident"))
            .basic_auth(&self.username, Some(&self.password))
            .json(&IncidentPayload::from(incident));
        let response: TableResponse<CreatedRecord> = self.client.json(request).await?;
        let created = response.result;

        info!(
            "Created incident {} ({})",
            created.number.as_deref().unwrap_or("?"),
            created.sys_id
        );
        Ok(Incident {
            link: self.incident_link(&created.sys_id),
            id: created.sys_id,
        })
    }

    async fn record_name(&self, link: &str) -> Result<String, CollaboratorError> {
        let request = self
            .client
            .get(link)
            .basic_auth(&self.username, Some(&self.password));
        let response: TableResponse<NamedRecord> = self.client.json(request).await?;
        Ok(response.result.name)
    }

    async fn set_field(&self, ci_id: &str, name: &str, value: &str) -> Result<(), CollaboratorError> {
        let mut payload = serde_json::Map::new();
        payload.insert(name.to_string(), json!(value));
        let payload = serde_json::Value::Object(payload);
        let record: serde_json::Value = self.update("cmdb_ci", ci_id, payload).await?;
        if record.get(name).and_then(|v| v.as_str()) != Some(value) {
            warn!("Field {} of {} did not take value {}", name, ci_id, value);
        }
        Ok(())
    }

    async fn ci_by_name(&self, name: &str) -> Result<ConfigurationItem, CollaboratorError> {
        let record: CiRecord = self
            .one("cmdb_ci", &format!("name={}", name), &format!("configuration item {}", name))
            .await?;
        Ok(record.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_power::Severity;

    #[test]
    fn test_location_without_coordinates() {
        let record: LocationRecord = serde_json::from_value(json!({
            "sys_id": "a1", "name": "Branch 12", "street": "100 Main St",
            "city": "Fresno", "state": "CA", "zip": "93721",
            "longitude": "", "latitude": "36.7"
        }))
        .unwrap();
        let site = Site::from(record);
        assert_eq!(site.id, "a1");
        assert!(site.coordinates.is_none());
    }

    #[test]
    fn test_location_with_coordinates() {
        let record: LocationRecord = serde_json::from_value(json!({
            "sys_id": "a1", "name": "Branch 12",
            "longitude": "-119.78", "latitude": "36.74"
        }))
        .unwrap();
        let site = Site::from(record);
        assert_eq!(
            site.coordinates,
            Some(Coordinates {
                longitude: -119.78,
                latitude: 36.74
            })
        );
    }

    #[test]
    fn test_ci_reference_fields() {
        let linked: CiRecord = serde_json::from_value(json!({
            "sys_id": "c1", "name": "Branch 12 - Meraki AP",
            "serial_number": "Q2XX-AAAA-BBBB", "mac_address": "",
            "warranty_expiration": "2024-05-01",
            "manufacturer": {"link": "https://x/api/now/table/core_company/9", "value": "9"}
        }))
        .unwrap();
        let ci = ConfigurationItem::from(linked);
        assert_eq!(ci.serial_number.as_deref(), Some("Q2XX-AAAA-BBBB"));
        assert!(ci.mac_address.is_none());
        assert_eq!(ci.warranty_expiration, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert!(ci.manufacturer_link.is_some());

        let empty: CiRecord = serde_json::from_value(json!({
            "sys_id": "c2", "name": "AP", "manufacturer": "", "warranty_expiration": "soon"
        }))
        .unwrap();
        let ci = ConfigurationItem::from(empty);
        assert!(ci.manufacturer_link.is_none());
        assert!(ci.warranty_expiration.is_none());
    }

    #[test]
    fn test_incident_payload_uses_one_level() {
        let incident = NewIncident {
            company: "Acme".to_string(),
            caller: "svc.adarca".to_string(),
            opened_by: "svc.adarca".to_string(),
            title: "Power outage".to_string(),
            description: "details".to_string(),
            severity: Severity::Medium,
            location: "Branch 12".to_string(),
            configuration_item: None,
        };
        let payload = serde_json::to_value(IncidentPayload::from(&incident)).unwrap();
        assert_eq!(payload["impact"], 2);
        assert_eq!(payload["urgency"], 2);
        assert_eq!(payload["severity"], 2);
        assert_eq!(payload["u_customer"], "Acme");
        assert_eq!(payload["cmdb_ci"], "");
    }

    #[test]
    fn test_base_url_from_instance() {
        let config = ServiceNowConfig {
            instance: "acme".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            base_url: None,
            access_point_class: default_access_point_class(),
            http: HttpSettings::default(),
        };
        let client = ServiceNowClient::new(&config).unwrap();
        assert_eq!(
            client.incident_link("abc"),
            "https://acme.service-now.com/incident?sys_id=abc"
        );
        assert_eq!(
            client.table_url("cmn_location"),
            "https://acme.service-now.com/api/now/table/cmn_location"
        );
    }
}
