//! Warranty Checker

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CollaboratorError;
use crate::model::ConfigurationItem;
use crate::ports::{Ticketing, WarrantyLookup};

/// Expired warranty found for a configuration item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarrantyCheckResult {
    pub device: String,
    pub warranty_end: NaiveDate,
    /// Whole days since expiry; zero when it expires today
    pub days_overdue: u32,
}

impl WarrantyCheckResult {
    pub fn message(&self) -> String {
        format!(
            "Warranty expired {} day(s) ago on {} for {}.",
            self.days_overdue, self.warranty_end, self.device
        )
    }
}

/// Days since `warranty_end`, or `None` while the warranty is still running
pub fn days_overdue(warranty_end: NaiveDate, today: NaiveDate) -> Option<u32> {
    if warranty_end <= today {
        u32::try_from((today - warranty_end).num_days()).ok()
    } else {
        None
    }
}

/// Compares recorded warranty dates against the vendor's authoritative ones
#[derive(Debug, Clone)]
pub struct WarrantyChecker {
    /// Manufacturer name the vendor lookup covers
    vendor: String,
}

impl WarrantyChecker {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
        }
    }

    /// Check one configuration item.
    ///
    /// Items from other manufacturers, without a serial number, or unknown to
    /// the vendor are skipped. A differing vendor date is written back to the
    /// CMDB before the comparison.
    pub async fn check(
        &self,
        ci: &mut ConfigurationItem,
        ticketing: &dyn Ticketing,
        lookup: &dyn WarrantyLookup,
        today: NaiveDate,
    ) -> Result<Option<WarrantyCheckResult>, CollaboratorError> {
        info!("Checking warranty information for configuration item {}", ci.name);

        let Some(link) = ci.manufacturer_link.as_deref() else {
            info!("Configuration item {} has no manufacturer", ci.name);
            return Ok(None);
        };
        let manufacturer = ticketing.record_name(link).await?;
        if manufacturer != self.vendor {
            info!("Unsupported manufacturer '{}' for checking warranty", manufacturer);
            return Ok(None);
        }

        let Some(serial) = ci.serial_number.as_deref().filter(|s| !s.is_empty()) else {
            warn!("Configuration item {} is missing serial number", ci.name);
            return Ok(None);
        };

        let Some(warranty_end) = lookup.coverage_end_date(serial).await? else {
            warn!("Cannot retrieve warranty information for configuration item {}", ci.name);
            return Ok(None);
        };

        if ci.warranty_expiration != Some(warranty_end) {
            info!("Warranty dates do not match. Updating ITSM with latest warranty");
            ticketing
                .set_field(&ci.id, "warranty_expiration", &warranty_end.to_string())
                .await?;
            ci.warranty_expiration = Some(warranty_end);
        }

        Ok(days_overdue(warranty_end, today).map(|days_overdue| {
            info!("Discovered warranty is expired for configuration item {}", ci.name);
            WarrantyCheckResult {
                device: ci.name.clone(),
                warranty_end,
                days_overdue,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Incident, NewIncident};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    struct FakeItsm {
        manufacturer: String,
        updates: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeItsm {
        fn new(manufacturer: &str) -> Self {
            Self {
                manufacturer: manufacturer.to_string(),
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Ticketing for FakeItsm {
        async fn create_incident(&self, _: &NewIncident) -> Result<Incident, CollaboratorError> {
            unreachable!("warranty checker never files tickets")
        }

        async fn record_name(&self, _link: &str) -> Result<String, CollaboratorError> {
            Ok(self.manufacturer.clone())
        }

        async fn set_field(&self, ci_id: &str, name: &str, value: &str) -> Result<(), CollaboratorError> {
            self.updates
                .lock()
                .unwrap()
                .push((ci_id.to_string(), name.to_string(), value.to_string()));
            Ok(())
        }

        async fn ci_by_name(&self, name: &str) -> Result<ConfigurationItem, CollaboratorError> {
            Err(CollaboratorError::NotFound(name.to_string()))
        }
    }

    struct FixedWarranty(Option<NaiveDate>);

    #[async_trait]
    impl WarrantyLookup for FixedWarranty {
        async fn coverage_end_date(&self, _serial: &str) -> Result<Option<NaiveDate>, CollaboratorError> {
            Ok(self.0)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ci(expiration: Option<NaiveDate>) -> ConfigurationItem {
        ConfigurationItem {
            id: "ci-1".to_string(),
            name: "Branch 12 - Meraki AP".to_string(),
            serial_number: Some("Q2XX-AAAA-BBBB".to_string()),
            warranty_expiration: expiration,
            manufacturer_link: Some("https://example/api/now/table/core_company/42".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_expired_today_counts() {
        let today = date(2024, 6, 1);
        let itsm = FakeItsm::new("Cisco");
        let mut item = ci(Some(today));

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(Some(today)), today)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.days_overdue, 0);
        assert!(itsm.updates.lock().unwrap().is_empty());
        assert_eq!(
            result.message(),
            "Warranty expired 0 day(s) ago on 2024-06-01 for Branch 12 - Meraki AP."
        );
    }

    #[tokio::test]
    async fn test_future_expiry_returns_nothing() {
        let itsm = FakeItsm::new("Cisco");
        let mut item = ci(None);

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(Some(date(2030, 1, 1))), date(2024, 6, 1))
            .await
            .unwrap();

        assert!(result.is_none());
        // Recorded date was missing, so it is still synced
        assert_eq!(
            itsm.updates.lock().unwrap().as_slice(),
            &[(
                "ci-1".to_string(),
                "warranty_expiration".to_string(),
                "2030-01-01".to_string()
            )]
        );
        assert_eq!(item.warranty_expiration, Some(date(2030, 1, 1)));
    }

    #[tokio::test]
    async fn test_mismatched_date_is_updated_before_comparison() {
        let itsm = FakeItsm::new("Cisco");
        let mut item = ci(Some(date(2025, 1, 1)));

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(Some(date(2024, 5, 22))), date(2024, 6, 1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.days_overdue, 10);
        assert_eq!(itsm.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_other_vendor_is_skipped() {
        let itsm = FakeItsm::new("Aruba");
        let mut item = ci(Some(date(2020, 1, 1)));

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(Some(date(2020, 1, 1))), date(2024, 6, 1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_serial_is_skipped() {
        let itsm = FakeItsm::new("Cisco");
        let mut item = ci(None);
        item.serial_number = Some(String::new());

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(Some(date(2020, 1, 1))), date(2024, 6, 1))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(itsm.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vendor_without_coverage_is_skipped() {
        let itsm = FakeItsm::new("Cisco");
        let mut item = ci(None);

        let result = WarrantyChecker::new("Cisco")
            .check(&mut item, &itsm, &FixedWarranty(None), date(2024, 6, 1))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    proptest! {
        #[test]
        fn prop_days_overdue(offset in -3650i64..3650) {
            let today = date(2024, 6, 1);
            let end = today + chrono::Duration::days(offset);
            match days_overdue(end, today) {
                Some(days) => {
                    prop_assert!(offset <= 0);
                    prop_assert_eq!(days as i64, -offset);
                }
                None => prop_assert!(offset > 0),
            }
        }
    }
}
