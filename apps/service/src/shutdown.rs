//! Process-wide stop signal threaded through the scheduler and the prober.

use tokio::sync::watch;

/// Create a linked trigger/listener pair
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), Shutdown(rx))
}

/// Sending half, held by whoever decides the process should stop
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}

/// Listening half, cloned into every task that should stop early
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// A listener whose trigger is already gone, so it never fires
    #[cfg(test)]
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Shutdown(rx)
    }

    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once shutdown has been triggered.
    ///
    /// If the trigger is dropped without firing this never resolves.
    pub async fn triggered(&mut self) {
        if self.0.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
