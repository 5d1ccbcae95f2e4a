//! Webhook Orchestrator
//!
//! Drives one alert through site resolution, signal collection, verdict,
//! ticket filing and alert closure. Collaborators are injected as trait
//! objects so the flow can run against live vendors or in-memory fakes.

mod closure;
mod collect;
mod site;
mod telemetry;
mod webhook;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

use site_power::ports::{
    AccessPointManager, AlertingPlatform, Geocoder, MonitoringPlatform, RouterManager, SiteDirectory,
    SocialFeed, Ticketing, UtilityOutageProvider, WarrantyLookup,
};
use std::sync::Arc;

pub use closure::ClosureGuard;
pub use collect::SignalCollector;
pub use site::{resolve_site, SiteError};
pub use telemetry::describe_metrics;
pub use webhook::{
    Orchestrator, OrchestratorSettings, Stage, TicketDefaults, WebhookOutcome, COMPLETION_MESSAGE,
    POWER_DOWN_TAG,
};

/// Handles to every external system
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn SiteDirectory>,
    pub ticketing: Arc<dyn Ticketing>,
    pub geocoder: Arc<dyn Geocoder>,
    pub utility: Arc<dyn UtilityOutageProvider>,
    pub monitoring: Arc<dyn MonitoringPlatform>,
    pub access_points: Arc<dyn AccessPointManager>,
    pub routers: Arc<dyn RouterManager>,
    pub alerting: Arc<dyn AlertingPlatform>,
    pub social: Arc<dyn SocialFeed>,
    /// Vendor warranty records; warranty checks are skipped without one
    pub warranty: Option<Arc<dyn WarrantyLookup>>,
}
