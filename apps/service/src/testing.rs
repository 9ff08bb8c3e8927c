//! In-memory stand-ins for the worker's collaborators, used by unit tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::monitoring::prober::Prober;
use crate::monitoring::types::{CheckSpec, ProbeOutcome};
use crate::notify::{Notifier, NotifyError};
use crate::shutdown::Shutdown;
use crate::store::{CheckStore, StoreError};

/// 20 character check id derived from `n`
pub fn check_id(n: usize) -> String {
    format!("check{n:0>15}")
}

/// A well-formed, never observed check record probing `http://<target>`
pub fn valid_record(id: &str, target: &str) -> Value {
    json!({
        "id": id,
        "userPhone": "5551234567",
        "protocol": "http",
        "url": target,
        "method": "get",
        "successCodes": [200],
        "timeoutSeconds": 3,
    })
}

#[derive(Default)]
pub struct MemoryCheckStore {
    records: Mutex<BTreeMap<String, Value>>,
    updates: AtomicUsize,
    fail_list: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryCheckStore {
    pub fn insert(&self, id: &str, record: Value) {
        self.records.lock().unwrap().insert(id.to_string(), record);
    }

    pub fn record(&self, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// Number of successful updates
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckStore for MemoryCheckStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::List {
                dir: PathBuf::from("memory"),
                source: io::Error::other("listing disabled"),
            });
        }
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }

    async fn read(&self, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.record(id))
    }

    async fn update(&self, id: &str, check: &CheckSpec) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                id: id.to_string(),
                source: io::Error::other("disk full"),
            });
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        *record = serde_json::to_value(check)
            .map_err(|source| StoreError::Serialize { id: id.to_string(), source })?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Alerts that were accepted, as `(owner_ref, message)`
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, owner_ref: &str, message: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Rejected { status: 503, message: "unavailable".into() });
        }
        self.sent.lock().unwrap().push((owner_ref.to_string(), message.to_string()));
        Ok(())
    }
}

/// Answers probes from a table keyed by check id, `200` when unscripted
#[derive(Default)]
pub struct ScriptedProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProber {
    /// Every probe takes `delay` before resolving
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn script(&self, id: &str, outcome: ProbeOutcome) {
        self.outcomes.lock().unwrap().insert(id.to_string(), outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of probes that were running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, check: &CheckSpec, shutdown: &mut Shutdown) -> Option<ProbeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let cancelled = match self.delay {
            Some(delay) => tokio::select! {
                _ = shutdown.triggered() => true,
                _ = tokio::time::sleep(delay) => false,
            },
            None => false,
        };
        self.running.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            return None;
        }
        let scripted = self.outcomes.lock().unwrap().get(&check.id).cloned();
        Some(scripted.unwrap_or_else(|| ProbeOutcome::response(200)))
    }
}
