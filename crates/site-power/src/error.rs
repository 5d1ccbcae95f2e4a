//! Collaborator Error Types

use thiserror::Error;

/// Errors raised by any external collaborator (directory, vendors, ITSM, alerting)
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one record matched where exactly one was expected
    #[error("Ambiguous match: {0}")]
    Ambiguous(String),

    /// Remote side answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Request never completed (connect, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be interpreted
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Collaborator is not configured in this deployment
    #[error("Collaborator unavailable: {0}")]
    Unavailable(&'static str),
}

impl CollaboratorError {
    /// Whether this error means the record is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollaboratorError::NotFound(_))
    }
}

/// Errors raised while resolving an address to coordinates
#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    #[error("No results found for address {0}.")]
    NoCandidate(String),

    #[error("Candidate score {score} below minimum score {min_score}. Address may not be specific enough.")]
    LowScore { score: f64, min_score: f64 },

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
