//! PRTG Network Monitor client

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use site_power::ports::MonitoringPlatform;
use site_power::{CollaboratorError, SensorReading};
use tracing::debug;

use crate::error::ClientError;
use crate::http::{trim_base, HttpSettings, RestClient};

/// PRTG connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct PrtgConfig {
    pub url: String,
    pub username: String,
    /// Password, or passhash when `is_passhash` is set
    pub password: String,
    #[serde(default)]
    pub is_passhash: bool,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct SensorTable {
    sensors: Vec<SensorRow>,
}

#[derive(Debug, Deserialize)]
struct SensorRow {
    objid: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    device: String,
    #[serde(default)]
    status: Option<String>,
}

impl From<SensorRow> for SensorReading {
    fn from(row: SensorRow) -> Self {
        SensorReading {
            id: row.objid,
            name: row.name,
            device: row.device,
            status: row.status,
        }
    }
}

/// Keep rows whose device name contains every part
fn matching(rows: Vec<SensorRow>, name_parts: &[&str]) -> Vec<SensorReading> {
    rows.into_iter()
        .filter(|row| name_parts.iter().all(|part| row.device.contains(part)))
        .map(Into::into)
        .collect()
}

/// PRTG table API client
pub struct PrtgClient {
    client: RestClient,
    url: String,
    username: String,
    password: String,
    is_passhash: bool,
}

impl PrtgClient {
    pub fn new(config: &PrtgConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: RestClient::new("prtg", &config.http, HeaderMap::new())?,
            url: trim_base(&config.url),
            username: config.username.clone(),
            password: config.password.clone(),
            is_passhash: config.is_passhash,
        })
    }
}

#[async_trait]
impl MonitoringPlatform for PrtgClient {
    async fn sensors_by_name(
        &self,
        sensor: &str,
        name_parts: &[&str],
    ) -> Result<Vec<SensorReading>, CollaboratorError> {
        let secret = if self.is_passhash { "passhash" } else { "password" };
        let request = self
            .client
            .get(&format!("{}/api/table.json", self.url))
            .query(&[
                ("content", "sensors"),
                ("columns", "objid,name,device,status"),
                ("count", "*"),
                ("filter_name", sensor),
                ("username", self.username.as_str()),
                (secret, self.password.as_str()),
            ]);

        let table: SensorTable = self.client.json(request).await?;
        let sensors = matching(table.sensors, name_parts);
        debug!("{} '{}' sensor(s) match {:?}", sensors.len(), sensor, name_parts);
        Ok(sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_requires_every_part() {
        let table: SensorTable = serde_json::from_str(
            r#"{"prtg-version": "23.1", "treesize": 3, "sensors": [
                {"objid": 1, "name": "Ping", "device": "Branch 12 - PI - LTE", "status": "Up"},
                {"objid": 2, "name": "Ping", "device": "Branch 12 - Switch", "status": "Down"},
                {"objid": 3, "name": "Ping", "device": "Branch 120 - PI - LTE", "status": "Paused"}
            ]}"#,
        )
        .unwrap();

        let sensors = matching(table.sensors, &["Branch 12 ", "PI - LTE"]);
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].id, 1);
        assert_eq!(sensors[0].status.as_deref(), Some("Up"));
    }

    #[test]
    fn test_missing_status_is_kept_as_none() {
        let table: SensorTable =
            serde_json::from_str(r#"{"sensors": [{"objid": 7, "device": "Probe Device"}]}"#).unwrap();
        let sensors = matching(table.sensors, &[]);
        assert_eq!(sensors[0].status, None);
    }
}
