//! Cisco Support API (serial number to warranty coverage)

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use site_power::ports::WarrantyLookup;
use site_power::CollaboratorError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::http::{trim_base, HttpSettings, RestClient};

fn default_url() -> String {
    "https://apix.cisco.com".to_string()
}

fn default_token_url() -> Option<String> {
    Some("https://id.cisco.com/oauth2/default/v1/token".to_string())
}

/// Refresh tokens this long before they expire
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// Cisco Support API settings
///
/// Without a `token_url` requests are sent unauthenticated, which suits a
/// local stand-in for the vendor API.
#[derive(Debug, Clone, Deserialize)]
pub struct CiscoSupportConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_token_url")]
    pub token_url: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub http: HttpSettings,
}

impl Default for CiscoSupportConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token_url: default_token_url(),
            client_id: String::new(),
            client_secret: String::new(),
            http: HttpSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct CoverageSummary {
    #[serde(default)]
    serial_numbers: Vec<SerialCoverage>,
}

#[derive(Debug, Deserialize)]
struct SerialCoverage {
    #[serde(default)]
    warranty_end_date: String,
}

/// First non-empty `warranty_end_date` in a coverage summary
fn end_date(summary: &CoverageSummary, serial: &str) -> Result<Option<NaiveDate>, CollaboratorError> {
    let Some(raw) = summary
        .serial_numbers
        .iter()
        .map(|s| s.warranty_end_date.trim())
        .find(|d| !d.is_empty())
    else {
        debug!("No warranty coverage for {}", serial);
        return Ok(None);
    };

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| CollaboratorError::Decode(format!("warranty end date {:?}: {}", raw, e)))
}

/// Coverage lookups with a cached client-credentials token
pub struct CiscoSupportClient {
    client: RestClient,
    url: String,
    token_url: Option<String>,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl CiscoSupportClient {
    pub fn new(config: &CiscoSupportConfig) -> Result<Self, ClientError> {
        if config.token_url.is_some() && config.client_id.is_empty() {
            return Err(ClientError::Config(
                "cisco support requires client_id when token_url is set".to_string(),
            ));
        }

        Ok(Self {
            client: RestClient::new("cisco", &config.http, HeaderMap::new())?,
            url: trim_base(&config.url),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    /// Bearer token, fetched again once the cached one is close to expiry
    async fn bearer(&self) -> Result<Option<String>, CollaboratorError> {
        let Some(token_url) = &self.token_url else {
            return Ok(None);
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(Some(token.value.clone()));
            }
        }

        let request = self.client.post(token_url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]);
        let response: TokenResponse = self.client.json(request).await?;
        info!("Obtained Cisco Support API token valid for {}s", response.expires_in);

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_MARGIN);
        let value = response.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(Some(value))
    }
}

#[async_trait]
impl WarrantyLookup for CiscoSupportClient {
    async fn coverage_end_date(&self, serial: &str) -> Result<Option<NaiveDate>, CollaboratorError> {
        let mut request = self
            .client
            .get(&format!("{}/sn2info/v2/coverage/summary/serial_numbers/{}", self.url, serial));
        if let Some(token) = self.bearer().await? {
            request = request.bearer_auth(token);
        }

        let summary: CoverageSummary = match self.client.json(request).await {
            Ok(summary) => summary,
            Err(e) if e.is_not_found() => {
                warn!("Cisco has no record of serial {}", serial);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        end_date(&summary, serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(json: &str) -> CoverageSummary {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_end_date_parsed() {
        let s = summary(
            r#"{"pagination_response_record": {}, "serial_numbers": [
                {"sr_no": "FOC1234X0AB", "warranty_end_date": "2025-03-31", "is_covered": "YES"}
            ]}"#,
        );
        assert_eq!(
            end_date(&s, "FOC1234X0AB").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31)
        );
    }

    #[test]
    fn test_missing_coverage_is_none() {
        assert_eq!(end_date(&summary(r#"{"serial_numbers": []}"#), "x").unwrap(), None);
        assert_eq!(
            end_date(&summary(r#"{"serial_numbers": [{"warranty_end_date": ""}]}"#), "x").unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_date_is_decode_error() {
        let s = summary(r#"{"serial_numbers": [{"warranty_end_date": "31/03/2025"}]}"#);
        assert!(matches!(end_date(&s, "x"), Err(CollaboratorError::Decode(_))));
    }

    #[tokio::test]
    async fn test_no_token_url_means_no_auth() {
        let config: CiscoSupportConfig =
            serde_json::from_str(r#"{"url": "http://localhost:9000/", "token_url": null}"#).unwrap();
        let client = CiscoSupportClient::new(&config).unwrap();
        assert_eq!(client.url, "http://localhost:9000");
        assert_eq!(client.bearer().await.unwrap(), None);
    }

    #[test]
    fn test_token_url_requires_credentials() {
        let config: CiscoSupportConfig = serde_json::from_str("{}").unwrap();
        assert!(matches!(CiscoSupportClient::new(&config), Err(ClientError::Config(_))));
    }
}
