//! ADARCA API Server
//!
//! Receives alert webhooks and on-demand site checks, authenticates them
//! with a shared secret and hands them to the orchestrator.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use orchestrator::Orchestrator;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
mod routes;
pub mod wiring;

use config::{AppConfig, LoggerConfig};
use rate_limit::{create_governor_config, DefaultGovernorConfig};

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Expected `X-API-Key` value
    pub token: String,
    pub version: String,
    pub start_time: Instant,
    /// Prometheus exporter, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, token: impl Into<String>) -> Self {
        Self {
            orchestrator,
            token: token.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router.
///
/// Every route except `/health` requires the API key; `governor` rate limits
/// the same routes per peer IP.
pub fn create_router(state: Arc<AppState>, governor: Option<Arc<DefaultGovernorConfig>>) -> Router {
    let mut protected = Router::new()
        .route("/webhook/ops", post(routes::webhook::ops_webhook))
        .route("/checkSite", get(routes::sites::check_site))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    if let Some(config) = governor {
        protected = protected.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            info_span!(
                "request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LoggerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {}", e))
}

/// Run the server
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    orchestrator::describe_metrics();

    let orchestrator = wiring::orchestrator(&config)?;
    let state = Arc::new(AppState::new(orchestrator, config.web.token.clone()).with_metrics(metrics));
    let governor = create_governor_config(&config.web.rate_limit)?;
    let app = create_router(state, Some(governor));

    let addr = config.web.addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use orchestrator::fakes::{webhook, World};
    use orchestrator::{OrchestratorSettings, COMPLETION_MESSAGE};
    use serde_json::Value;
    use tower::ServiceExt;

    const TOKEN: &str = "s3cret";

    fn app(world: World) -> (Arc<World>, Router) {
        let (world, collaborators) = world.into_collaborators();
        let orchestrator = Orchestrator::new(collaborators, OrchestratorSettings::default());
        let state = Arc::new(AppState::new(orchestrator, TOKEN));
        (world, create_router(state, None))
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("X-API-Key", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_webhook(token: &str, priority: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook/ops")
            .header("X-API-Key", token)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&webhook(priority)).unwrap()))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (_, app) = app(World::healthy());
        let response = app.oneshot(get("/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_is_rejected() {
        let (world, app) = app(World::healthy());

        for token in [None, Some("wrong")] {
            let response = app
                .clone()
                .oneshot(get("/checkSite?site_name=Fresno%2012", token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json(response).await["detail"], "Invalid token");
        }
        assert!(world.calls().is_empty());
    }

    #[tokio::test]
    async fn test_check_site_returns_record() {
        let (_, app) = app(World::blacked_out());
        let response = app
            .oneshot(get("/checkSite?site_name=Fresno%2012", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["SiteName"], "Fresno 12");
        assert_eq!(body["Power_ProviderStatus"], "Down");
        assert_eq!(body["Power_OutageType"], "Unplanned");
        assert_eq!(body["Power_SitePower"], "Down");
    }

    #[tokio::test]
    async fn test_check_unknown_site_is_404() {
        let (_, app) = app(World::healthy());
        let response = app
            .oneshot(get("/checkSite?site_name=Atlantis", Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["detail"], "Could not find site Atlantis");
    }

    #[tokio::test]
    async fn test_webhook_completes_and_closes() {
        let (world, app) = app(World::healthy());
        let response = app.oneshot(post_webhook(TOKEN, "P2")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, Value::String(COMPLETION_MESSAGE.to_string()));
        assert_eq!(world.count("close_alert"), 1);
        assert_eq!(world.count("create_incident"), 1);
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_site_is_404() {
        let mut world = World::healthy();
        world.site = None;
        let (world, app) = app(world);

        let response = app.oneshot(post_webhook(TOKEN, "P2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!world.called("close_alert"));
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (_, app) = app(World::healthy());
        let response = app.oneshot(get("/metrics", Some(TOKEN))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
