use std::sync::Arc;
use tracing::{error, info};

use super::types::CheckSpec;
use crate::notify::Notifier;

/// Text sent to the owner when a check changes state
pub fn alert_message(check: &CheckSpec) -> String {
    let state = check.state.map_or_else(|| "unknown".to_string(), |state| state.to_string());
    format!(
        "Alert: Your check for {} {} is currently {}",
        check.method.as_upper(),
        check.endpoint(),
        state
    )
}

/// Formats transition alerts and hands them to the notifier.
///
/// Delivery is attempted once; a failure is logged and dropped.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Returns whether the notifier accepted the alert
    pub async fn dispatch(&self, check: &CheckSpec) -> bool {
        let message = alert_message(check);

        match self.notifier.send(&check.owner_ref, &message).await {
            Ok(()) => {
                info!("Owner of check {} was alerted to a status change: {}", check.id, message);
                true
            }
            Err(e) => {
                error!("Could not alert owner of check {} to a status change: {}", check.id, e);
                false
            }
        }
    }
}
