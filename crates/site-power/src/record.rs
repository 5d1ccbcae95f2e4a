//! Outage record produced for one site check

use serde::{Deserialize, Serialize};

use crate::aggregator::Verdict;
use crate::VERDICT_KEY;

/// Utility outage dataset answer for a site's coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderReport {
    /// No outage incident near the site
    Active,
    /// An outage incident covers the site
    Inactive(OutageDetail),
}

/// Details the utility dataset publishes for an active outage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutageDetail {
    #[serde(rename = "Power_StartDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "Power_OutageType", skip_serializing_if = "Option::is_none")]
    pub outage_type: Option<String>,
    #[serde(rename = "Power_Cause", skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(
        rename = "Power_EstimatedRestoreDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_restore_date: Option<String>,
    #[serde(rename = "Power_ImpactedCustomers", skip_serializing_if = "Option::is_none")]
    pub customers_affected: Option<i64>,
    #[serde(rename = "Power_UtilityCompany", skip_serializing_if = "Option::is_none")]
    pub utility: Option<String>,
}

/// Aggregated status of a site, built fresh per request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutageRecord {
    #[serde(rename = "SiteName")]
    pub site_name: String,
    #[serde(rename = "Power_ProviderStatus")]
    pub provider_status: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub outage: Option<OutageDetail>,
    #[serde(rename = "PRTG_PiStatus")]
    pub ping_status: String,
    #[serde(rename = "PRTG_ProbeStatus")]
    pub probe_status: String,
    #[serde(rename = "Cisco_MerakiStatus")]
    pub access_point_status: String,
    #[serde(rename = "Cradlepoint_RouterStatus")]
    pub router_status: String,
    #[serde(rename = "Power_SitePower")]
    pub verdict: Verdict,
}

impl OutageRecord {
    /// Flatten into ordered key/value pairs for alert properties
    pub fn details(&self) -> Vec<(&'static str, String)> {
        let mut details = vec![
            ("SiteName", self.site_name.clone()),
            ("Power_ProviderStatus", self.provider_status.clone()),
        ];

        if let Some(outage) = &self.outage {
            let fields = [
                ("Power_StartDate", outage.start_date.clone()),
                ("Power_OutageType", outage.outage_type.clone()),
                ("Power_Cause", outage.cause.clone()),
                ("Power_EstimatedRestoreDate", outage.estimated_restore_date.clone()),
                ("Power_ImpactedCustomers", outage.customers_affected.map(|n| n.to_string())),
                ("Power_UtilityCompany", outage.utility.clone()),
            ];
            details.extend(
                fields
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key, v))),
            );
        }

        details.extend([
            ("PRTG_PiStatus", self.ping_status.clone()),
            ("PRTG_ProbeStatus", self.probe_status.clone()),
            ("Cisco_MerakiStatus", self.access_point_status.clone()),
            ("Cradlepoint_RouterStatus", self.router_status.clone()),
            (VERDICT_KEY, self.verdict.to_string()),
        ]);
        details
    }

    /// Public outage notice; fields the provider did not report read `N/A`
    pub fn social_post(&self) -> String {
        let outage = self.outage.clone().unwrap_or_default();
        let field = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());

        format!(
            "Start Date: {}\nType: {}\nCause: {}\nEstimated Restore Date: {}",
            field(outage.start_date),
            field(outage.outage_type),
            field(outage.cause),
            field(outage.estimated_restore_date),
        )
    }
}
