//! Client Construction Errors

use thiserror::Error;

/// Errors raised while building a client from configuration
#[derive(Debug, Error)]
pub enum ClientError {
    /// A credential cannot be sent as an HTTP header
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// Underlying HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Build(#[from] reqwest::Error),

    /// Configuration is incomplete or contradictory
    #[error("Invalid configuration: {0}")]
    Config(String),
}
