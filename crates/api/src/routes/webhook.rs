//! Alert Webhook Route

use axum::extract::State;
use axum::Json;
use site_power::AlertWebhook;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// Run the power check for an alert, file the ticket and close the alert
pub async fn ops_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<AlertWebhook>,
) -> Result<Json<&'static str>, ApiError> {
    let outcome = state.orchestrator.handle_webhook(webhook).await?;
    info!(stage = ?outcome.stage, closed = outcome.alert_closed, "Webhook handled");
    Ok(Json(outcome.message))
}
