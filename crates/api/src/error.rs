//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orchestrator::SiteError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned to HTTP callers as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid token")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadGateway(String),
}

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        if err.is_structural() {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::BadGateway(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(detail) => {
                error!("Upstream failure: {}", detail);
                StatusCode::BAD_GATEWAY
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_power::{CollaboratorError, GeocodeError};

    #[test]
    fn test_site_error_mapping() {
        let not_found = ApiError::from(SiteError::NotFound("Fresno 12".to_string()));
        assert!(matches!(not_found, ApiError::NotFound(ref d) if d == "Could not find site Fresno 12"));

        let low_score = ApiError::from(SiteError::Geocode(GeocodeError::LowScore {
            score: 70.0,
            min_score: 90.0,
        }));
        assert!(matches!(low_score, ApiError::NotFound(_)));

        let outage = ApiError::from(SiteError::Directory(CollaboratorError::Transport("reset".to_string())));
        assert_eq!(outage.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
