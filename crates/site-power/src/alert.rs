//! Inbound alert webhook payload

use serde::{Deserialize, Serialize};

/// Alert-routed webhook sent by the alerting platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertWebhook {
    pub alert: Alert,
    /// Name of the automated action that triggered the webhook
    pub action_name: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Alert as owned by the alerting platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub description: String,
    /// Priority string of the form `P<n>`
    pub priority: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub extra_properties: ExtraProperties,
    #[serde(default)]
    pub tiny_id: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Structured properties attached by the monitoring integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraProperties {
    /// Site group name; the site to check
    pub group: String,
    /// Device identifier the alert was raised for
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub sensor_id: Option<String>,
}

impl Alert {
    /// Prepend collected check details to the alert description
    pub fn prepend_details<'a, I>(&mut self, details: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let lines: Vec<String> = details
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();

        self.description = format!(
            "Power Check Details\n{}\n\nAlert Details\n{}",
            lines.join("\n"),
            self.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "alert": {
            "id": "70413a06-38d6-4c85-92b8-5ebc900d42e2",
            "message": "Ping sensor down at Branch 12",
            "description": "Sensor reported Down for 5 minutes",
            "priority": "P2",
            "tags": ["prtg"],
            "tinyId": "1791",
            "extraProperties": {"group": "Branch 12", "device": "Branch 12 - Meraki AP", "sensorId": "2041"}
        },
        "actionName": "CheckPower",
        "customerName": "acme"
    }"#;

    #[test]
    fn test_deserialize_webhook() {
        let webhook: AlertWebhook = serde_json::from_str(PAYLOAD).unwrap();
        assert_eq!(webhook.action_name, "CheckPower");
        assert_eq!(webhook.alert.priority, "P2");
        assert_eq!(webhook.alert.extra_properties.group, "Branch 12");
        assert_eq!(webhook.alert.extra_properties.sensor_id.as_deref(), Some("2041"));
        assert!(webhook.alert.entity.is_none());
    }

    #[test]
    fn test_prepend_details() {
        let mut webhook: AlertWebhook = serde_json::from_str(PAYLOAD).unwrap();
        webhook
            .alert
            .prepend_details([("SiteName", "Branch 12"), ("Power_SitePower", "Down")]);

        assert_eq!(
            webhook.alert.description,
            "Power Check Details\nSiteName: Branch 12\nPower_SitePower: Down\n\n\
             Alert Details\nSensor reported Down for 5 minutes"
        );
    }
}
