//! Webhook state machine
//!
//! `ReceivedAlert -> SiteResolved -> SignalsCollected -> VerdictComputed ->
//! TicketFiled -> AlertClosed`
//!
//! Only a site that cannot be located stops the flow, and it does so before
//! the alert is touched. Once the alert is mutated a [`ClosureGuard`] makes
//! sure it gets closed.

use chrono::Utc;
use serde::Deserialize;
use site_power::ports::ACCEPTED;
use site_power::{
    aggregate, Alert, AlertWebhook, CollaboratorError, Incident, NewIncident, OutageRecord, Severity, SignalSet,
    Site, Verdict, WarrantyCheckResult, WarrantyChecker,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::closure::ClosureGuard;
use crate::collect::SignalCollector;
use crate::site::{resolve_site, SiteError};
use crate::{telemetry, Collaborators};

/// Returned for every handled webhook, whichever ticket was filed
pub const COMPLETION_MESSAGE: &str =
    "ADARCA request complete. Incident has been created and this alert will close.";

/// Tag added to alerts whose site is down
pub const POWER_DOWN_TAG: &str = "SitePowerDown";

const CLOSE_NOTE: &str = "Alert closed by ADARCA.";

/// Caller fields stamped on every incident
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketDefaults {
    pub company: String,
    pub caller: String,
    pub opened_by: String,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub tickets: TicketDefaults,
    /// Limit for each signal lookup
    pub signal_timeout: Duration,
    /// Limit for each ticketing, alerting or social call
    pub collaborator_timeout: Duration,
    /// Manufacturer whose warranties are checked; `None` disables the check
    pub warranty_vendor: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tickets: TicketDefaults::default(),
            signal_timeout: Duration::from_secs(30),
            collaborator_timeout: Duration::from_secs(30),
            warranty_vendor: None,
        }
    }
}

/// Furthest state a webhook reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    ReceivedAlert,
    SiteResolved,
    SignalsCollected,
    VerdictComputed,
    TicketFiled,
    AlertClosed,
}

#[derive(Debug)]
pub struct WebhookOutcome {
    pub message: &'static str,
    pub stage: Stage,
    /// Every state entered, in order
    pub stages: Vec<Stage>,
    /// Power record, absent when the site directory was unreachable
    pub record: Option<OutageRecord>,
    pub incident: Option<Incident>,
    pub warranty: Option<WarrantyCheckResult>,
    pub alert_closed: bool,
}

impl WebhookOutcome {
    fn reach(&mut self, stage: Stage) {
        debug!(?stage, "Webhook advanced");
        self.stage = stage;
        self.stages.push(stage);
    }
}

pub struct Orchestrator {
    collaborators: Collaborators,
    settings: OrchestratorSettings,
    warranty: Option<WarrantyChecker>,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, settings: OrchestratorSettings) -> Self {
        let warranty = match (&settings.warranty_vendor, &collaborators.warranty) {
            (Some(vendor), Some(_)) => Some(WarrantyChecker::new(vendor.clone())),
            (Some(vendor), None) => {
                warn!("No warranty lookup configured; {} warranties will not be checked", vendor);
                None
            }
            (None, _) => None,
        };

        Self {
            collaborators,
            settings,
            warranty,
        }
    }

    /// Resolve a site and compute its power record
    pub async fn check_site(&self, site_name: &str) -> Result<OutageRecord, SiteError> {
        let site = self.resolve(site_name).await?;
        let signals = self.collect(&site).await;
        Ok(self.verdict(&site, signals))
    }

    #[instrument(skip_all, fields(alert_id = %webhook.alert.id, site = %webhook.alert.extra_properties.group))]
    pub async fn handle_webhook(&self, webhook: AlertWebhook) -> Result<WebhookOutcome, SiteError> {
        telemetry::webhook_received();
        let AlertWebhook {
            mut alert,
            action_name,
            ..
        } = webhook;
        info!("Alert \"{}\" triggered ADARCA", alert.message);
        debug!(?alert, "Webhook payload");

        let site_name = alert.extra_properties.group.clone();
        let site = match self.resolve(&site_name).await {
            Ok(site) => Some(site),
            Err(e) if e.is_structural() => {
                warn!("Aborting before any alert change: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!("Continuing without power check: {}", e);
                None
            }
        };

        let guard = ClosureGuard::arm(
            self.collaborators.alerting.clone(),
            alert.id.clone(),
            CLOSE_NOTE,
            self.settings.collaborator_timeout,
        );

        let mut outcome = WebhookOutcome {
            message: COMPLETION_MESSAGE,
            stage: Stage::ReceivedAlert,
            stages: vec![Stage::ReceivedAlert],
            record: None,
            incident: None,
            warranty: None,
            alert_closed: false,
        };

        if let Some(site) = site {
            outcome.reach(Stage::SiteResolved);
            let signals = self.collect(&site).await;
            outcome.reach(Stage::SignalsCollected);
            let record = self.verdict(&site, signals);
            outcome.reach(Stage::VerdictComputed);

            outcome.warranty = self.check_warranty(&alert).await;
            self.annotate(&mut alert, &record, &action_name).await;
            outcome.record = Some(record);
        }

        outcome.incident = self.file_incident(&alert, &site_name, outcome.record.as_ref()).await;
        outcome.reach(Stage::TicketFiled);

        outcome.alert_closed = guard.close().await;
        outcome.reach(Stage::AlertClosed);
        info!("ADARCA request complete");
        Ok(outcome)
    }

    async fn resolve(&self, site_name: &str) -> Result<Site, SiteError> {
        resolve_site(
            self.collaborators.directory.as_ref(),
            self.collaborators.geocoder.as_ref(),
            site_name,
        )
        .await
    }

    async fn collect(&self, site: &Site) -> SignalSet {
        info!("Found site {}. Getting power status", site.name);
        SignalCollector::new(&self.collaborators, self.settings.signal_timeout)
            .collect(site)
            .await
    }

    fn verdict(&self, site: &Site, signals: SignalSet) -> OutageRecord {
        let record = aggregate(site, signals);
        info!("Site {} power verdict: {}", site.name, record.verdict);
        telemetry::verdict_computed(record.verdict);
        record
    }

    /// Tag on outage, post the collected details and fold them into the description
    async fn annotate(&self, alert: &mut Alert, record: &OutageRecord, action_name: &str) {
        let alerting = &self.collaborators.alerting;

        if record.verdict == Verdict::Down {
            info!("Adding outage tag to alert");
            let note = format!(
                "Automated action {} detected site power is down. Tag has been added.",
                action_name
            );
            if let Some(status) = self
                .attempt("add_tags", alerting.add_tags(&alert.id, &[POWER_DOWN_TAG], &note))
                .await
            {
                accepted("add_tags", &alert.id, status);
            }
        }

        info!("Adding collected status details to alert");
        let details = record.details();
        let note = format!(
            "Automated action {} completed. Details of collected statuses have been added as extra properties.",
            action_name
        );
        if let Some(status) = self
            .attempt("add_details", alerting.add_details(&alert.id, &details, &note))
            .await
        {
            accepted("add_details", &alert.id, status);
        }

        alert.prepend_details(details.iter().map(|(key, value)| (*key, value.as_str())));
    }

    /// Outage incident when the site is down, otherwise the alert forwarded as is
    async fn file_incident(&self, alert: &Alert, site_name: &str, record: Option<&OutageRecord>) -> Option<Incident> {
        let outage = record.filter(|r| r.verdict.is_outage());
        let title = match outage {
            Some(_) => format!("[ADARCA] Power outage detected for site {}", site_name),
            None => alert.message.clone(),
        };

        info!("Forwarding alert to ITSM");
        let incident = self.new_incident(title, alert.description.clone(), self.severity(alert), site_name, None);
        let created = self
            .attempt("create_incident", self.collaborators.ticketing.create_incident(&incident))
            .await;
        if let Some(created) = &created {
            info!("Created incident {}", created.id);
        }

        if let Some(record) = outage {
            info!("Posting outage details");
            self.attempt("post_update", self.collaborators.social.post_update(&record.social_post()))
                .await;
        }
        created
    }

    /// Check the alert's device and file a separate ticket if its warranty lapsed
    async fn check_warranty(&self, alert: &Alert) -> Option<WarrantyCheckResult> {
        let checker = self.warranty.as_ref()?;
        let lookup = self.collaborators.warranty.as_ref()?;
        let ticketing = &self.collaborators.ticketing;

        let device = alert.extra_properties.device.trim();
        if device.is_empty() {
            debug!("Alert names no device; skipping warranty check");
            return None;
        }

        let mut ci = self.attempt("warranty_check", ticketing.ci_by_name(device)).await?;
        let today = Utc::now().date_naive();
        let result = self
            .attempt(
                "warranty_check",
                checker.check(&mut ci, ticketing.as_ref(), lookup.as_ref(), today),
            )
            .await??;

        info!("{}", result.message());
        let incident = self.new_incident(
            format!("[ADARCA] Warranty expired for {}", result.device),
            result.message(),
            self.severity(alert).escalated(),
            &alert.extra_properties.group,
            Some(ci.id.clone()),
        );
        if let Some(created) = self
            .attempt("create_incident", ticketing.create_incident(&incident))
            .await
        {
            info!("Created warranty incident {}", created.id);
        }
        Some(result)
    }

    fn severity(&self, alert: &Alert) -> Severity {
        Severity::from_priority(&alert.priority).unwrap_or_else(|e| {
            warn!("{}; filing as {}", e, Severity::Low);
            Severity::Low
        })
    }

    fn new_incident(
        &self,
        title: String,
        description: String,
        severity: Severity,
        location: &str,
        configuration_item: Option<String>,
    ) -> NewIncident {
        let tickets = &self.settings.tickets;
        NewIncident {
            company: tickets.company.clone(),
            caller: tickets.caller.clone(),
            opened_by: tickets.opened_by.clone(),
            title,
            description,
            severity,
            location: location.to_string(),
            configuration_item,
        }
    }

    /// Run a side effect under the collaborator timeout; failures are logged and counted
    async fn attempt<T, F>(&self, kind: &'static str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let limit = self.settings.collaborator_timeout;
        let result = match timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Transport(format!("timed out after {:?}", limit))),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{} failed: {}", kind, e);
                telemetry::side_effect_failed(kind);
                None
            }
        }
    }
}

fn accepted(kind: &'static str, alert_id: &str, status: u16) {
    if status == ACCEPTED {
        info!("{} accepted for alert {}", kind, alert_id);
    } else {
        error!("{} rejected for alert {} with status {}", kind, alert_id, status);
        telemetry::side_effect_failed(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{webhook, World, SITE_NAME};
    use chrono::{Days, NaiveDate};
    use site_power::ConfigurationItem;
    use std::sync::Arc;

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            tickets: TicketDefaults {
                company: "Contoso".to_string(),
                caller: "adarca".to_string(),
                opened_by: "adarca".to_string(),
            },
            signal_timeout: Duration::from_secs(5),
            collaborator_timeout: Duration::from_secs(5),
            warranty_vendor: Some("Cisco".to_string()),
        }
    }

    fn orchestrator(world: World) -> (Arc<World>, Orchestrator) {
        let (world, collaborators) = world.into_collaborators();
        (world, Orchestrator::new(collaborators, settings()))
    }

    fn incidents(world: &World) -> Vec<NewIncident> {
        world.incidents.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_site_up_forwards_alert() {
        let (world, orchestrator) = orchestrator(World::healthy());
        let outcome = orchestrator.handle_webhook(webhook("P3")).await.unwrap();

        assert_eq!(outcome.message, COMPLETION_MESSAGE);
        assert_eq!(outcome.stage, Stage::AlertClosed);
        assert!(outcome.alert_closed);
        assert_eq!(outcome.record.unwrap().verdict, Verdict::Up);
        assert_eq!(
            outcome.stages,
            vec![
                Stage::ReceivedAlert,
                Stage::SiteResolved,
                Stage::SignalsCollected,
                Stage::VerdictComputed,
                Stage::TicketFiled,
                Stage::AlertClosed,
            ]
        );

        let filed = incidents(&world);
        assert_eq!(filed.len(), 1);
        assert_eq!(filed[0].title, "Site Fresno 12 unreachable");
        assert_eq!(filed[0].severity, Severity::Medium);
        assert_eq!(filed[0].company, "Contoso");
        assert!(filed[0].description.starts_with("Power Check Details\nSiteName: Fresno 12\n"));
        assert!(filed[0].description.ends_with("Alert Details\nPing sensor down for 5 minutes"));

        assert!(!world.called("add_tags"));
        assert!(!world.called("post_update"));
        assert_eq!(world.count("add_details"), 1);
        assert_eq!(world.count("close_alert"), 1);
    }

    #[tokio::test]
    async fn test_site_down_files_outage() {
        let (world, orchestrator) = orchestrator(World::blacked_out());
        let outcome = orchestrator.handle_webhook(webhook("P1")).await.unwrap();

        assert_eq!(outcome.record.as_ref().unwrap().verdict, Verdict::Down);
        assert_eq!(*world.tags.lock().unwrap(), vec![POWER_DOWN_TAG.to_string()]);

        let filed = incidents(&world);
        assert_eq!(filed[0].title, "[ADARCA] Power outage detected for site Fresno 12");
        assert_eq!(filed[0].severity, Severity::High);
        assert_eq!(filed[0].location, SITE_NAME);

        let posts = world.posts.lock().unwrap().clone();
        assert_eq!(
            posts,
            vec!["Start Date: 2024-06-01 10:15:00\nType: Unplanned\nCause: Equipment Failure\nEstimated Restore Date: N/A"
                .to_string()]
        );

        let details = world.details.lock().unwrap().clone();
        let keys: Vec<&str> = details[0].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "SiteName",
                "Power_ProviderStatus",
                "Power_StartDate",
                "Power_OutageType",
                "Power_Cause",
                "PRTG_PiStatus",
                "PRTG_ProbeStatus",
                "Cisco_MerakiStatus",
                "Cradlepoint_RouterStatus",
                "Power_SitePower",
            ]
        );
        assert_eq!(world.count("close_alert"), 1);
    }

    #[tokio::test]
    async fn test_likely_up_is_generic_ticket() {
        let mut world = World::healthy();
        world.ping = Ok(vec![]);
        world.probe = Err(CollaboratorError::Transport("refused".to_string()));
        world.access_points = vec![];
        world.router_up = Err(CollaboratorError::NotFound("router".to_string()));

        let (world, orchestrator) = orchestrator(world);
        let outcome = orchestrator.handle_webhook(webhook("P4")).await.unwrap();

        assert_eq!(outcome.record.unwrap().verdict, Verdict::LikelyUp);
        assert_eq!(incidents(&world)[0].title, "Site Fresno 12 unreachable");
        assert!(!world.called("add_tags"));
        assert!(!world.called("post_update"));
    }

    #[tokio::test]
    async fn test_unknown_site_touches_nothing() {
        let mut world = World::healthy();
        world.site = None;

        let (world, orchestrator) = orchestrator(world);
        let err = orchestrator.handle_webhook(webhook("P2")).await.unwrap_err();

        assert!(matches!(err, SiteError::NotFound(ref name) if name == SITE_NAME));
        assert_eq!(world.calls(), vec!["site_by_name".to_string()]);
    }

    #[tokio::test]
    async fn test_geocode_failure_touches_nothing() {
        let mut world = World::healthy();
        world.site.as_mut().unwrap().coordinates = None;
        world.geocode = Err(site_power::GeocodeError::LowScore {
            score: 71.0,
            min_score: 90.0,
        });

        let (world, orchestrator) = orchestrator(world);
        assert!(orchestrator.handle_webhook(webhook("P2")).await.is_err());
        assert!(!world.called("close_alert"));
        assert!(!world.called("create_incident"));
    }

    #[tokio::test]
    async fn test_ticket_failure_still_closes_once() {
        let mut world = World::blacked_out();
        world.incident_error = Some(CollaboratorError::Http {
            status: 500,
            message: "ITSM down".to_string(),
        });
        world.alerting_status = 400;

        let (world, orchestrator) = orchestrator(world);
        let outcome = orchestrator.handle_webhook(webhook("P1")).await.unwrap();

        assert!(outcome.incident.is_none());
        assert!(!outcome.alert_closed);
        assert_eq!(outcome.stage, Stage::AlertClosed);
        assert_eq!(outcome.message, COMPLETION_MESSAGE);
        assert_eq!(world.count("close_alert"), 1);
    }

    #[tokio::test]
    async fn test_ticket_panic_still_closes_once() {
        let mut world = World::healthy();
        world.panic_on_incident = true;

        let (world, orchestrator) = orchestrator(world);
        let orchestrator = Arc::new(orchestrator);
        let task = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.handle_webhook(webhook("P3")).await.map(|o| o.stage) }
        });
        assert!(task.await.unwrap_err().is_panic());

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(world.count("close_alert"), 1);
    }

    #[tokio::test]
    async fn test_directory_outage_still_forwards_and_closes() {
        let mut world = World::healthy();
        world.directory_error = Some(CollaboratorError::Transport("timeout".to_string()));

        let (world, orchestrator) = orchestrator(world);
        let outcome = orchestrator.handle_webhook(webhook("P5")).await.unwrap();

        assert!(outcome.record.is_none());
        assert_eq!(outcome.stage, Stage::AlertClosed);
        assert_eq!(
            outcome.stages,
            vec![Stage::ReceivedAlert, Stage::TicketFiled, Stage::AlertClosed]
        );
        assert_eq!(incidents(&world)[0].description, "Ping sensor down for 5 minutes");
        assert!(!world.called("add_details"));
        assert_eq!(world.count("close_alert"), 1);
    }

    #[tokio::test]
    async fn test_expired_warranty_files_escalated_ticket() {
        let today = Utc::now().date_naive();
        let mut world = World::healthy();
        world.cis = vec![ConfigurationItem {
            id: "ci-ap01".to_string(),
            name: "fresno12-meraki-ap01".to_string(),
            serial_number: Some("Q2XX-AAAA-BBBB".to_string()),
            warranty_expiration: NaiveDate::from_ymd_opt(2030, 1, 1),
            manufacturer_link: Some("https://itsm.example/core_company/1".to_string()),
            ..Default::default()
        }];
        world.warranty_end = today.checked_sub_days(Days::new(3));

        let (world, orchestrator) = orchestrator(world);
        let outcome = orchestrator.handle_webhook(webhook("P3")).await.unwrap();

        let warranty = outcome.warranty.unwrap();
        assert_eq!(warranty.days_overdue, 3);
        assert!(world.called("set_field:warranty_expiration"));

        let filed = incidents(&world);
        assert_eq!(filed.len(), 2);
        assert_eq!(filed[0].title, "[ADARCA] Warranty expired for fresno12-meraki-ap01");
        assert_eq!(filed[0].severity, Severity::High);
        assert_eq!(filed[0].configuration_item.as_deref(), Some("ci-ap01"));
        assert_eq!(filed[1].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_unknown_priority_files_low() {
        let (world, orchestrator) = orchestrator(World::healthy());
        orchestrator.handle_webhook(webhook("urgent")).await.unwrap();
        assert_eq!(incidents(&world)[0].severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_check_site_returns_record() {
        let (world, orchestrator) = orchestrator(World::blacked_out());
        let record = orchestrator.check_site(SITE_NAME).await.unwrap();

        assert_eq!(record.verdict, Verdict::Down);
        assert_eq!(record.provider_status, "Down");
        assert!(!world.called("close_alert"));
    }
}
