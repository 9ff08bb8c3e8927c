use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::alert::AlertDispatcher;
use super::types::{CheckSpec, CheckState, ProbeOutcome};
use crate::store::CheckStore;

/// What processing one outcome decided
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// The record with `state` and `last_checked` updated
    pub check: CheckSpec,
    /// State before this outcome, `None` if never observed
    pub previous_state: Option<CheckState>,
    pub alert_warranted: bool,
}

/// Up iff a response arrived and its status is one of the success codes
pub fn classify(success_codes: &[u16], outcome: &ProbeOutcome) -> CheckState {
    match (&outcome.failure, outcome.status_code) {
        (None, Some(code)) if success_codes.contains(&code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Fold an outcome into a check observed at `now_ms`.
///
/// A check with no `last_checked` is being seen for the first time and never
/// warrants an alert, whatever its new state.
pub fn decide(mut check: CheckSpec, outcome: &ProbeOutcome, now_ms: i64) -> Decision {
    let new_state = classify(&check.success_codes, outcome);
    let previous_state = check.state;
    let alert_warranted = !check.is_first_observation() && previous_state != Some(new_state);

    check.state = Some(new_state);
    check.last_checked = Some(now_ms);

    Decision { check, previous_state, alert_warranted }
}

/// Persists each outcome and alerts on transitions
pub struct OutcomeProcessor {
    store: Arc<dyn CheckStore>,
    dispatcher: AlertDispatcher,
}

impl OutcomeProcessor {
    pub fn new(store: Arc<dyn CheckStore>, dispatcher: AlertDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Persisting and alerting are independent: a failed update is logged and
    /// the alert is still sent if one is warranted.
    pub async fn process(&self, check: CheckSpec, outcome: ProbeOutcome) -> Decision {
        let decision = decide(check, &outcome, Utc::now().timestamp_millis());
        let check = &decision.check;
        let new_state = check.state.unwrap_or(CheckState::Down);

        match decision.previous_state {
            Some(previous) => info!(
                "Check {} - {} {} - {} - {} -> {}",
                check.id,
                check.method.as_upper(),
                check.endpoint(),
                outcome,
                previous,
                new_state
            ),
            None => info!(
                "Check {} - {} {} - {} - now {}",
                check.id,
                check.method.as_upper(),
                check.endpoint(),
                outcome,
                new_state
            ),
        }

        if let Err(e) = self.store.update(&check.id, check).await {
            error!("Error trying to save updates to check {}: {}", check.id, e);
        }

        if decision.alert_warranted {
            self.dispatcher.dispatch(check).await;
        } else {
            debug!("Check {} outcome has not changed, no alert needed", check.id);
        }

        decision
    }
}
