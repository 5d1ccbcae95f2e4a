//! Site Check Route

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use site_power::OutageRecord;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckSiteQuery {
    pub site_name: String,
}

/// Current power record for one site
pub async fn check_site(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckSiteQuery>,
) -> Result<Json<OutageRecord>, ApiError> {
    let record = state.orchestrator.check_site(&params.site_name).await?;
    Ok(Json(record))
}
