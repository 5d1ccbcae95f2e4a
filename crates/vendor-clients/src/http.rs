//! Shared HTTP plumbing: timeouts, bounded concurrency, error mapping

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use site_power::CollaboratorError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Default timeout for a single vendor request
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default number of in-flight requests per vendor
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Per-vendor transport settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum concurrent requests to this vendor
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `reqwest::Client` with a concurrency limit shared by all its requests
#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    name: &'static str,
    http: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl RestClient {
    pub fn new(
        name: &'static str,
        settings: &HttpSettings,
        headers: HeaderMap,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            name,
            http,
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.http.patch(url)
    }

    /// Send a request and decode a successful JSON body
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CollaboratorError> {
        let _permit = self.acquire().await?;
        let response = self.dispatch(request).await?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("{}: {}", self.name, e)))
    }

    /// Send a request, requiring a success status and ignoring the body
    pub async fn send(&self, request: RequestBuilder) -> Result<(), CollaboratorError> {
        let _permit = self.acquire().await?;
        let response = self.dispatch(request).await?;
        check_status(response).await.map(|_| ())
    }

    /// Send a request and report the status code, whatever it is
    pub async fn status(&self, request: RequestBuilder) -> Result<u16, CollaboratorError> {
        let _permit = self.acquire().await?;
        let response = self.dispatch(request).await?;
        Ok(response.status().as_u16())
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, CollaboratorError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| CollaboratorError::Unavailable(self.name))
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response, CollaboratorError> {
        let response = request.send().await.map_err(|e| {
            warn!("{} request failed: {}", self.name, e);
            transport(e)
        })?;
        debug!("{} {} -> {}", self.name, response.url().path(), response.status());
        Ok(response)
    }
}

/// Turn a non-success response into an error carrying the body text
async fn check_status(response: Response) -> Result<Response, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        Err(CollaboratorError::NotFound(message))
    } else {
        Err(CollaboratorError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

pub(crate) fn transport(err: reqwest::Error) -> CollaboratorError {
    if err.is_decode() {
        CollaboratorError::Decode(err.to_string())
    } else {
        CollaboratorError::Transport(err.to_string())
    }
}

/// Build a header map from static names and configured values
pub(crate) fn headers<'a, I>(pairs: I) -> Result<HeaderMap, ClientError>
where
    I: IntoIterator<Item = (&'static str, &'a str)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let mut value = HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name))?;
        value.set_sensitive(true);
        map.insert(HeaderName::from_static(name), value);
    }
    Ok(map)
}

/// Strip a trailing slash so paths can be appended with `format!`
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
