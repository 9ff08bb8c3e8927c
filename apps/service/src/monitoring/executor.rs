use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::alert::AlertDispatcher;
use super::outcome::{Decision, OutcomeProcessor};
use super::prober::Prober;
use super::validation::validate_stored_check;
use crate::notify::Notifier;
use crate::shutdown::Shutdown;
use crate::store::CheckStore;

/// Runs one check's pipeline: read, validate, probe, process
pub struct CheckExecutor {
    store: Arc<dyn CheckStore>,
    prober: Arc<dyn Prober>,
    processor: OutcomeProcessor,
}

impl CheckExecutor {
    pub fn new(
        store: Arc<dyn CheckStore>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let processor = OutcomeProcessor::new(store.clone(), AlertDispatcher::new(notifier));
        Self { store, prober, processor }
    }

    /// Execute the pipeline for `id`.
    ///
    /// Returns `None` when the check was skipped: unreadable, malformed, or
    /// cancelled by shutdown. Nothing is written in that case.
    pub async fn execute(&self, id: &str, mut shutdown: Shutdown) -> Option<Decision> {
        if shutdown.is_triggered() {
            return None;
        }

        let raw = match self.store.read(id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("Check {} disappeared before it could be read", id);
                return None;
            }
            Err(e) => {
                error!("Error reading check {}: {}", id, e);
                return None;
            }
        };

        let check = match validate_stored_check(id, &raw) {
            Ok(check) => check,
            Err(e) => {
                warn!("Check {} is not properly formatted, skipping it: {}", id, e);
                return None;
            }
        };

        debug!("Probing {} {} for check {}", check.method.as_upper(), check.endpoint(), check.id);

        let Some(outcome) = self.prober.probe(&check, &mut shutdown).await else {
            info!("Probe for check {} cancelled by shutdown", id);
            return None;
        };

        Some(self.processor.process(check, outcome).await)
    }
}
