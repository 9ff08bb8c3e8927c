use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::executor::CheckExecutor;
use crate::config::WorkerConfig;
use crate::shutdown::Shutdown;
use crate::store::CheckStore;

/// Ids whose pipeline is still running
#[derive(Default)]
struct InFlight {
    ids: Mutex<HashSet<String>>,
}

impl InFlight {
    /// `None` if `id` is already claimed
    fn claim(self: &Arc<Self>, id: &str) -> Option<InFlightGuard> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard { in_flight: Arc::clone(self), id: id.to_string() })
    }
}

/// Releases its id when the pipeline task ends, however it ends
struct InFlightGuard {
    in_flight: Arc<InFlight>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.ids.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    }
}

/// Drives check cycles: every tick, list all checks and spawn one pipeline per check.
///
/// Pipelines are not awaited by the loop, so a slow check never delays the next
/// cycle or its siblings.
pub struct CheckScheduler {
    store: Arc<dyn CheckStore>,
    executor: Arc<CheckExecutor>,
    interval: Duration,
    limiter: Option<Arc<Semaphore>>,
    in_flight: Option<Arc<InFlight>>,
}

impl CheckScheduler {
    pub fn new(
        store: Arc<dyn CheckStore>,
        executor: Arc<CheckExecutor>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            executor,
            interval: Duration::from_secs(config.interval_seconds),
            limiter: config.max_concurrent_probes.map(|n| Arc::new(Semaphore::new(n))),
            in_flight: config.skip_in_flight.then(Arc::default),
        }
    }

    /// Run cycles until shutdown. The first cycle starts immediately.
    pub async fn run(self, mut shutdown: Shutdown) {
        info!("Check worker started, running a cycle every {}s", self.interval.as_secs());

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => {
                    info!("Shutdown requested, no further check cycles will start");
                    break;
                }
                _ = timer.tick() => {
                    let handles = self.run_cycle(&shutdown).await;
                    debug!("Launched {} check pipelines", handles.len());
                }
            }
        }
    }

    /// List every check and spawn its pipeline.
    ///
    /// The handles are returned for callers that want to wait on the cycle;
    /// dropping them detaches the tasks.
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let ids = match self.store.list().await {
            Ok(ids) if ids.is_empty() => {
                warn!("Could not find any checks to process");
                return Vec::new();
            }
            Ok(ids) => ids,
            Err(e) => {
                error!("Could not list checks, skipping this cycle: {}", e);
                return Vec::new();
            }
        };

        info!("Found {} checks to process", ids.len());

        ids.into_iter().filter_map(|id| self.launch(id, shutdown.clone())).collect()
    }

    fn launch(&self, id: String, shutdown: Shutdown) -> Option<JoinHandle<()>> {
        let guard = match &self.in_flight {
            Some(in_flight) => match in_flight.claim(&id) {
                Some(guard) => Some(guard),
                None => {
                    warn!("Check {} is still running from an earlier cycle, skipping it", id);
                    return None;
                }
            },
            None => None,
        };

        let executor = Arc::clone(&self.executor);
        let limiter = self.limiter.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match limiter {
                Some(limiter) => match limiter.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            executor.execute(&id, shutdown).await;
        }))
    }
}
