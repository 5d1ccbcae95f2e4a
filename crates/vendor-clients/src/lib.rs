//! Vendor Clients
//!
//! `reqwest` implementations of the collaborator contracts in
//! [`site_power::ports`]:
//! - ServiceNow (site directory, CMDB, incidents)
//! - Opsgenie (alerting)
//! - PRTG (ping / probe-health sensors)
//! - Meraki (wireless access points)
//! - Cradlepoint NetCloud (cellular routers)
//! - ArcGIS (geocoding, utility outage dataset)
//! - Twitter (public outage notices)
//! - Cisco Support (warranty coverage)
//!
//! Every client bounds its in-flight requests with a semaphore and applies a
//! per-request timeout.

mod cisco;
mod error;
mod geocode;
mod gis;
mod http;
mod meraki;
mod netcloud;
mod opsgenie;
mod prtg;
mod servicenow;
mod twitter;

pub use cisco::{CiscoSupportClient, CiscoSupportConfig};
pub use error::ClientError;
pub use geocode::{ArcGisGeocoder, GeocodeConfig};
pub use gis::{DateTimeConfig, GisConfig, GisOutageProvider};
pub use http::HttpSettings;
pub use meraki::{MerakiClient, MerakiConfig};
pub use netcloud::{NetCloudClient, NetCloudConfig};
pub use opsgenie::{OpsgenieClient, OpsgenieConfig};
pub use prtg::{PrtgClient, PrtgConfig};
pub use servicenow::{ServiceNowClient, ServiceNowConfig};
pub use twitter::{TwitterClient, TwitterConfig};
