//! Opsgenie Alert API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use site_power::ports::AlertingPlatform;
use site_power::CollaboratorError;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ClientError;
use crate::http::{headers, trim_base, HttpSettings, RestClient};

fn default_url() -> String {
    "https://api.opsgenie.com".to_string()
}

fn default_source() -> String {
    "adarca".to_string()
}

/// Opsgenie connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct OpsgenieConfig {
    pub api_key: String,
    #[serde(default = "default_url")]
    pub url: String,
    /// Reported as the source of every alert action
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Serialize)]
struct DetailsPayload<'a> {
    details: BTreeMap<&'a str, &'a str>,
    note: &'a str,
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct TagsPayload<'a> {
    tags: &'a [&'a str],
    note: &'a str,
    source: &'a str,
}

#[derive(Debug, Serialize)]
struct ClosePayload<'a> {
    note: &'a str,
    source: &'a str,
}

/// Opsgenie Alert API client
pub struct OpsgenieClient {
    client: RestClient,
    url: String,
    source: String,
}

impl OpsgenieClient {
    pub fn new(config: &OpsgenieConfig) -> Result<Self, ClientError> {
        let auth = format!("GenieKey {}", config.api_key);
        Ok(Self {
            client: RestClient::new(
                "opsgenie",
                &config.http,
                headers([("authorization", auth.as_str())])?,
            )?,
            url: trim_base(&config.url),
            source: config.source.clone(),
        })
    }

    fn alert_url(&self, alert_id: &str, action: &str) -> String {
        format!("{}/v2/alerts/{}/{}", self.url, alert_id, action)
    }
}

#[async_trait]
impl AlertingPlatform for OpsgenieClient {
    async fn add_details(
        &self,
        alert_id: &str,
        details: &[(&str, String)],
        note: &str,
    ) -> Result<u16, CollaboratorError> {
        let payload = DetailsPayload {
            details: details.iter().map(|(k, v)| (*k, v.as_str())).collect(),
            note,
            source: &self.source,
        };
        let request = self
            .client
            .post(&self.alert_url(alert_id, "details"))
            .query(&[("identifierType", "id")])
            .json(&payload);
        let status = self.client.status(request).await?;
        debug!("Add details to alert {} -> {}", alert_id, status);
        Ok(status)
    }

    async fn add_tags(&self, alert_id: &str, tags: &[&str], note: &str) -> Result<u16, CollaboratorError> {
        let payload = TagsPayload {
            tags,
            note,
            source: &self.source,
        };
        let request = self
            .client
            .post(&self.alert_url(alert_id, "tags"))
            .query(&[("identifierType", "id")])
            .json(&payload);
        self.client.status(request).await
    }

    async fn close_alert(&self, alert_id: &str, note: &str) -> Result<u16, CollaboratorError> {
        let payload = ClosePayload {
            note,
            source: &self.source,
        };
        let request = self
            .client
            .post(&self.alert_url(alert_id, "close"))
            .query(&[("identifierType", "id")])
            .json(&payload);
        self.client.status(request).await
    }
}
