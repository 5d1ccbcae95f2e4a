//! Guaranteed alert closure

use site_power::ports::{AlertingPlatform, ACCEPTED};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::telemetry;

/// Closes an alert exactly once.
///
/// [`ClosureGuard::close`] is the normal path. A guard dropped while still
/// armed (the owning future panicked or was cancelled) spawns the close
/// call onto the current runtime instead.
pub struct ClosureGuard {
    alerting: Arc<dyn AlertingPlatform>,
    alert_id: String,
    note: String,
    timeout: Duration,
    armed: bool,
}

impl ClosureGuard {
    pub fn arm(
        alerting: Arc<dyn AlertingPlatform>,
        alert_id: impl Into<String>,
        note: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            alerting,
            alert_id: alert_id.into(),
            note: note.into(),
            timeout,
            armed: true,
        }
    }

    /// Close the alert now; returns whether the platform accepted it.
    ///
    /// The guard stays armed until the call returns, so cancelling this
    /// future mid-call still closes the alert from `Drop`.
    pub async fn close(mut self) -> bool {
        info!("Closing alert {}", self.alert_id);
        let closed = close_alert(self.alerting.as_ref(), &self.alert_id, &self.note, self.timeout).await;
        self.armed = false;
        closed
    }
}

impl Drop for ClosureGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!("Request ended before closing alert {}; closing in background", self.alert_id);
        let Ok(handle) = Handle::try_current() else {
            error!("No runtime left to close alert {}", self.alert_id);
            telemetry::side_effect_failed("close_alert");
            return;
        };

        let alerting = Arc::clone(&self.alerting);
        let alert_id = std::mem::take(&mut self.alert_id);
        let note = std::mem::take(&mut self.note);
        let limit = self.timeout;
        handle.spawn(async move {
            close_alert(alerting.as_ref(), &alert_id, &note, limit).await;
        });
    }
}

async fn close_alert(alerting: &dyn AlertingPlatform, alert_id: &str, note: &str, limit: Duration) -> bool {
    match timeout(limit, alerting.close_alert(alert_id, note)).await {
        Ok(Ok(ACCEPTED)) => {
            info!("Closed alert {}", alert_id);
            true
        }
        Ok(Ok(status)) => {
            error!("Could not close alert {}: status {}", alert_id, status);
            telemetry::side_effect_failed("close_alert");
            false
        }
        Ok(Err(e)) => {
            error!("Could not close alert {}: {}", alert_id, e);
            telemetry::side_effect_failed("close_alert");
            false
        }
        Err(_) => {
            error!("Closing alert {} timed out after {:?}", alert_id, limit);
            telemetry::side_effect_failed("close_alert");
            false
        }
    }
}
