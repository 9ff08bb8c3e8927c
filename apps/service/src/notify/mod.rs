//! Alert delivery to check owners.
//!
//! `LogNotifier` is the default and only writes the alert to the log.
//! `TwilioNotifier` sends it as an SMS to the owner's phone number.

pub mod log;
pub mod twilio;

pub use self::log::LogNotifier;
pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{NotifierConfig, NotifierKind};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),
    #[error("message must be between 1 and {max} characters, got {len}")]
    InvalidMessage { len: usize, max: usize },
    #[error("request to notification provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Delivers a human-readable alert to the owner of a check
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, owner_ref: &str, message: &str) -> Result<(), NotifyError>;
}

/// Build the notifier selected in the config
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    let notifier: Arc<dyn Notifier> = match config.kind {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Twilio => Arc::new(TwilioNotifier::new(&config.twilio)?),
    };
    Ok(notifier)
}
