//! Utility outage dataset (ArcGIS feature service)
//!
//! Queries the power outage incident layer for features intersecting a
//! site's coordinates. No feature means no known outage.

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use site_power::ports::UtilityOutageProvider;
use site_power::{CollaboratorError, OutageDetail, ProviderReport, Site};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::http::{HttpSettings, RestClient};

fn default_url() -> String {
    "https://services.arcgis.com/BLN4oKB0N1YSgvY8/arcgis/rest/services/Power_Outages_(View)/FeatureServer/0/query"
        .to_string()
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// How outage timestamps are rendered
#[derive(Debug, Clone, Deserialize)]
pub struct DateTimeConfig {
    /// Offset from UTC, in hours, used for display
    #[serde(default)]
    pub utc_offset_hours: i32,
    /// `strftime` format
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for DateTimeConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            time_format: default_time_format(),
        }
    }
}

impl DateTimeConfig {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Whether `time_format` only holds specifiers chrono understands
    pub fn is_valid_format(&self) -> bool {
        !StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error))
    }

    /// Render an epoch-milliseconds timestamp; `None` when the timestamp is
    /// out of range or the format cannot be rendered
    pub fn format_epoch_ms(&self, epoch_ms: i64) -> Option<String> {
        let utc = DateTime::from_timestamp_millis(epoch_ms)?;
        let mut rendered = String::new();
        match write!(rendered, "{}", utc.with_timezone(&self.offset()).format(&self.time_format)) {
            Ok(()) => Some(rendered),
            Err(_) => {
                warn!("Cannot render timestamp with format '{}'", self.time_format);
                None
            }
        }
    }
}

/// Utility dataset settings
#[derive(Debug, Clone, Deserialize)]
pub struct GisConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Extra query parameters (e.g. `distance`, `units`), merged over defaults
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub date_time: DateTimeConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize)]
struct FeatureSet {
    features: Option<Vec<Feature>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    attributes: Map<String, Value>,
}

fn text(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Typed outage detail from a feature's attributes
fn outage_detail(attributes: &Map<String, Value>, date_time: &DateTimeConfig) -> OutageDetail {
    let timestamp = |key: &str| {
        attributes
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|ms| date_time.format_epoch_ms(ms))
    };

    OutageDetail {
        start_date: timestamp("StartDate"),
        outage_type: text(attributes, "OutageType"),
        cause: text(attributes, "Cause"),
        estimated_restore_date: timestamp("EstimatedRestoreDate"),
        customers_affected: attributes.get("ImpactedCustomers").and_then(Value::as_i64),
        utility: text(attributes, "UtilityCompany"),
    }
}

fn report(set: FeatureSet, date_time: &DateTimeConfig) -> Result<ProviderReport, CollaboratorError> {
    let Some(features) = set.features else {
        let detail = set.error.map(|e| e.to_string()).unwrap_or_default();
        return Err(CollaboratorError::Decode(format!("no features in outage response {}", detail)));
    };

    match features.as_slice() {
        [] => {
            info!("No outages found near the site");
            Ok(ProviderReport::Active)
        }
        [closest, rest @ ..] => {
            if !rest.is_empty() {
                warn!("More than one outage found. Using the closest outage");
            }
            info!("Outage found near the site");
            Ok(ProviderReport::Inactive(outage_detail(&closest.attributes, date_time)))
        }
    }
}

/// Power outage incident layer client
pub struct GisOutageProvider {
    client: RestClient,
    url: String,
    params: BTreeMap<String, String>,
    date_time: DateTimeConfig,
}

impl GisOutageProvider {
    pub fn new(config: &GisConfig) -> Result<Self, ClientError> {
        let mut params: BTreeMap<String, String> = [
            ("f", "json"),
            ("outFields", "*"),
            ("returnGeometry", "false"),
            ("spatialRel", "esriSpatialRelIntersects"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        params.extend(config.params.clone());

        Ok(Self {
            client: RestClient::new("gis", &config.http, HeaderMap::new())?,
            url: config.url.clone(),
            params,
            date_time: config.date_time.clone(),
        })
    }
}

#[async_trait]
impl UtilityOutageProvider for GisOutageProvider {
    async fn status(&self, site: &Site) -> Result<ProviderReport, CollaboratorError> {
        let coordinates = site
            .coordinates
            .ok_or_else(|| CollaboratorError::NotFound(format!("coordinates of site {}", site.name)))?;

        let mut params = self.params.clone();
        params.insert(
            "geometry".to_string(),
            format!("{},{}", coordinates.longitude, coordinates.latitude),
        );
        params.insert("inSR".to_string(), "4326".to_string());
        params.insert("geometryType".to_string(), "esriGeometryPoint".to_string());

        let request = self.client.get(&self.url).query(&params);
        let set: FeatureSet = self.client.json(request).await?;
        debug!("Outage dataset returned {:?} feature(s)", set.features.as_ref().map(Vec::len));
        report(set, &self.date_time)
    }
}
