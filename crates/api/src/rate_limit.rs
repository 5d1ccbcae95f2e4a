//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Limits authenticated routes per peer IP with tower_governor. GCRA needs
//! no background process; quota state lives in the governor store.

use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::config::ConfigError;

/// Governor config keyed on peer IP, adding X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    #[serde(default = "default_per_second")]
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_per_second() -> u64 {
    1
}

fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Build the governor config for the authenticated routes.
///
/// Peer IPs come from `ConnectInfo`, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_governor_config(config: &RateLimitConfig) -> Result<Arc<DefaultGovernorConfig>, ConfigError> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "rate limit needs non-zero per_second and burst_size, got {} and {}",
                config.per_second, config.burst_size
            ))
        })
}
