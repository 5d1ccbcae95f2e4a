//! Cradlepoint NetCloud Manager client

use async_trait::async_trait;
use serde::Deserialize;
use site_power::ports::RouterManager;
use site_power::CollaboratorError;
use tracing::debug;

use crate::error::ClientError;
use crate::http::{headers, trim_base, HttpSettings, RestClient};

/// NetCloud API v2 credentials
#[derive(Debug, Clone, Deserialize)]
pub struct NetCloudConfig {
    pub url: String,
    pub cp_id: String,
    pub cp_key: String,
    pub ecm_id: String,
    pub ecm_key: String,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct RouterPage {
    data: Vec<Router>,
}

#[derive(Debug, Deserialize)]
struct Router {
    #[serde(default)]
    state: String,
}

fn first_router_online(page: RouterPage, name: &str) -> Result<bool, CollaboratorError> {
    page.data
        .first()
        .map(|router| router.state == "online")
        .ok_or_else(|| CollaboratorError::NotFound(format!("router {}", name)))
}

/// NetCloud Manager router API client
pub struct NetCloudClient {
    client: RestClient,
    url: String,
}

impl NetCloudClient {
    pub fn new(config: &NetCloudConfig) -> Result<Self, ClientError> {
        let auth = headers([
            ("x-cp-api-id", config.cp_id.as_str()),
            ("x-cp-api-key", config.cp_key.as_str()),
            ("x-ecm-api-id", config.ecm_id.as_str()),
            ("x-ecm-api-key", config.ecm_key.as_str()),
        ])?;

        Ok(Self {
            client: RestClient::new("netcloud", &config.http, auth)?,
            url: trim_base(&config.url),
        })
    }
}

#[async_trait]
impl RouterManager for NetCloudClient {
    async fn router_status_by_name(&self, name: &str) -> Result<bool, CollaboratorError> {
        let request = self
            .client
            .get(&format!("{}/api/v2/routers/", self.url))
            .query(&[("name", name), ("fields", "name,state")]);
        let page: RouterPage = self.client.json(request).await?;
        let online = first_router_online(page, name)?;
        debug!("Router {} online: {}", name, online);
        Ok(online)
    }
}
