//! Builds live vendor clients and the orchestrator from configuration

use orchestrator::{Collaborators, Orchestrator, OrchestratorSettings};
use site_power::ports::WarrantyLookup;
use std::sync::Arc;
use tracing::info;
use vendor_clients::{
    ArcGisGeocoder, CiscoSupportClient, ClientError, GisConfig, GisOutageProvider, MerakiClient, NetCloudClient,
    OpsgenieClient, PrtgClient, ServiceNowClient, TwitterClient,
};

use crate::config::AppConfig;

pub fn collaborators(config: &AppConfig) -> Result<Collaborators, ClientError> {
    let snow = Arc::new(ServiceNowClient::new(&config.snow)?);
    let gis = GisConfig {
        date_time: config.date_time.clone(),
        ..config.gis.clone()
    };

    let warranty: Option<Arc<dyn WarrantyLookup>> = if config.warranty.enabled {
        info!("Warranty checks enabled for {}", config.warranty.vendor);
        Some(Arc::new(CiscoSupportClient::new(&config.warranty.support)?))
    } else {
        None
    };

    Ok(Collaborators {
        directory: snow.clone(),
        ticketing: snow,
        geocoder: Arc::new(ArcGisGeocoder::new(&config.geocode)?),
        utility: Arc::new(GisOutageProvider::new(&gis)?),
        monitoring: Arc::new(PrtgClient::new(&config.prtg)?),
        access_points: Arc::new(MerakiClient::new(&config.meraki)?),
        routers: Arc::new(NetCloudClient::new(&config.netcloud)?),
        alerting: Arc::new(OpsgenieClient::new(&config.opsgenie)?),
        social: Arc::new(TwitterClient::new(&config.twitter)?),
        warranty,
    })
}

pub fn settings(config: &AppConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        tickets: config.tickets.clone(),
        signal_timeout: config.timeouts.signal(),
        collaborator_timeout: config.timeouts.collaborator(),
        warranty_vendor: config
            .warranty
            .enabled
            .then(|| config.warranty.vendor.clone()),
    }
}

pub fn orchestrator(config: &AppConfig) -> Result<Orchestrator, ClientError> {
    Ok(Orchestrator::new(collaborators(config)?, settings(config)))
}
