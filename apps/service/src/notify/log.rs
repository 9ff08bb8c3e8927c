use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifyError};

/// Writes alerts to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, owner_ref: &str, message: &str) -> Result<(), NotifyError> {
        info!(owner = owner_ref, "{}", message);
        Ok(())
    }
}
