//! Meraki Dashboard API client

use async_trait::async_trait;
use serde::Deserialize;
use site_power::ports::AccessPointManager;
use site_power::{CollaboratorError, Device};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::http::{headers, trim_base, HttpSettings, RestClient};

fn default_url() -> String {
    "https://api.meraki.com/api/v1".to_string()
}

/// Meraki connection settings; one of `org_id` / `org_name` is required
#[derive(Debug, Clone, Deserialize)]
pub struct MerakiConfig {
    pub api_key: String,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct Organization {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MerakiDevice {
    serial: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mac: Option<String>,
}

impl From<MerakiDevice> for Device {
    fn from(device: MerakiDevice) -> Self {
        Device {
            serial: device.serial,
            name: device.name,
            mac: device.mac,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceStatus {
    #[serde(default)]
    status: String,
}

/// Online and alerting devices are both powered and reachable
fn is_up(status: &str) -> bool {
    matches!(status, "online" | "alerting")
}

/// Meraki organization-scoped client
pub struct MerakiClient {
    client: RestClient,
    url: String,
    org_name: Option<String>,
    org_id: OnceCell<String>,
}

impl MerakiClient {
    pub fn new(config: &MerakiConfig) -> Result<Self, ClientError> {
        if config.org_id.is_none() && config.org_name.is_none() {
            return Err(ClientError::Config(
                "meraki requires org_id or org_name".to_string(),
            ));
        }

        let org_id = OnceCell::new();
        if let Some(id) = &config.org_id {
            let _ = org_id.set(id.clone());
        }

        Ok(Self {
            client: RestClient::new(
                "meraki",
                &config.http,
                headers([("x-cisco-meraki-api-key", config.api_key.as_str())])?,
            )?,
            url: trim_base(&config.url),
            org_name: config.org_name.clone(),
            org_id,
        })
    }

    /// Organization id, resolved by name on first use
    async fn org_id(&self) -> Result<&str, CollaboratorError> {
        let id = self
            .org_id
            .get_or_try_init(|| async {
                let name = self
                    .org_name
                    .as_deref()
                    .ok_or(CollaboratorError::Unavailable("meraki organization"))?;
                let request = self.client.get(&format!("{}/organizations", self.url));
                let orgs: Vec<Organization> = self.client.json(request).await?;
                let org = orgs
                    .into_iter()
                    .find(|org| org.name == name)
                    .ok_or_else(|| CollaboratorError::NotFound(format!("Meraki organization {}", name)))?;
                info!("Resolved Meraki organization {} to {}", name, org.id);
                Ok::<_, CollaboratorError>(org.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn devices(&self, filter: (&str, &str)) -> Result<Vec<MerakiDevice>, CollaboratorError> {
        let org_id = self.org_id().await?;
        let request = self
            .client
            .get(&format!("{}/organizations/{}/devices", self.url, org_id))
            .query(&[filter]);
        self.client.json(request).await
    }
}

#[async_trait]
impl AccessPointManager for MerakiClient {
    async fn device_by_mac(&self, mac: &str) -> Result<Device, CollaboratorError> {
        self.devices(("mac", mac))
            .await?
            .into_iter()
            .next()
            .map(Into::into)
            .ok_or_else(|| CollaboratorError::NotFound(format!("Meraki device with MAC {}", mac)))
    }

    async fn device_by_name(&self, name: &str) -> Result<Device, CollaboratorError> {
        let devices = self.devices(("name", name)).await?;
        // The name filter also matches substrings; prefer an exact match
        let position = devices
            .iter()
            .position(|d| d.name.as_deref() == Some(name))
            .unwrap_or(0);
        devices
            .into_iter()
            .nth(position)
            .map(Into::into)
            .ok_or_else(|| CollaboratorError::NotFound(format!("Meraki device named {}", name)))
    }

    async fn device_status(&self, serial: &str) -> Result<bool, CollaboratorError> {
        let org_id = self.org_id().await?;
        let request = self
            .client
            .get(&format!("{}/organizations/{}/devices/statuses", self.url, org_id))
            .query(&[("serials[]", serial)]);
        let statuses: Vec<DeviceStatus> = self.client.json(request).await?;
        let status = statuses
            .first()
            .ok_or_else(|| CollaboratorError::NotFound(format!("Meraki status for {}", serial)))?;

        debug!("Meraki device {} is {}", serial, status.status);
        Ok(is_up(&status.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(is_up("online"));
        assert!(is_up("alerting"));
        assert!(!is_up("offline"));
        assert!(!is_up("dormant"));
        assert!(!is_up(""));
    }

    #[test]
    fn test_requires_organization() {
        let config: MerakiConfig = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();
        assert!(matches!(MerakiClient::new(&config), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_configured_org_id_skips_lookup() {
        let config: MerakiConfig =
            serde_json::from_str(r#"{"api_key": "k", "org_id": "549236"}"#).unwrap();
        let client = MerakiClient::new(&config).unwrap();
        assert_eq!(client.org_id().await.unwrap(), "549236");
    }

    #[test]
    fn test_device_conversion() {
        let device: MerakiDevice =
            serde_json::from_str(r#"{"serial": "Q2XX-AAAA-BBBB", "mac": "00:18:0a:00:00:01"}"#).unwrap();
        let device = Device::from(device);
        assert_eq!(device.serial, "Q2XX-AAAA-BBBB");
        assert!(device.name.is_none());
    }
}
