//! Twitter API v2 client for public outage notices

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use site_power::ports::SocialFeed;
use site_power::CollaboratorError;
use tracing::info;

use crate::error::ClientError;
use crate::http::{headers, HttpSettings, RestClient};

fn default_url() -> String {
    "https://api.twitter.com/2/tweets".to_string()
}

/// Twitter settings; the token is an OAuth 2.0 user-context access token
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub access_token: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct Created {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Posts tweets on behalf of the configured account
pub struct TwitterClient {
    client: RestClient,
    url: String,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Result<Self, ClientError> {
        let auth = format!("Bearer {}", config.access_token);
        Ok(Self {
            client: RestClient::new("twitter", &config.http, headers([("authorization", auth.as_str())])?)?,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl SocialFeed for TwitterClient {
    async fn post_update(&self, text: &str) -> Result<(), CollaboratorError> {
        let request = self.client.post(&self.url).json(&json!({ "text": text }));
        let created: Created = self.client.json(request).await?;
        info!("Posted outage update {}", created.data.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_response() {
        let created: Created =
            serde_json::from_str(r#"{"data": {"id": "1445880548472328192", "text": "Start Date: ..."}}"#).unwrap();
        assert_eq!(created.data.id, "1445880548472328192");
    }

    #[test]
    fn test_default_url() {
        let config: TwitterConfig = serde_json::from_str(r#"{"access_token": "t"}"#).unwrap();
        assert_eq!(config.url, "https://api.twitter.com/2/tweets");
        assert!(TwitterClient::new(&config).is_ok());
    }
}
