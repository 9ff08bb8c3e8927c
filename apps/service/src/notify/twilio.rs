use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Notifier, NotifyError};
use crate::config::TwilioConfig;

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Longest body Twilio accepts for a single message
pub const MAX_MESSAGE_LEN: usize = 1600;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Sends alerts as SMS through the Twilio Messages API.
///
/// Owners are identified by a 10 digit North American number; the `+1`
/// country prefix is added here.
pub struct TwilioNotifier {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_phone: String,
}

impl TwilioNotifier {
    pub fn new(config: &TwilioConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base.trim_end_matches('/'),
            config.account_sid
        );

        Ok(Self {
            client,
            messages_url,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_phone: config.from_phone.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, owner_ref: &str, message: &str) -> Result<(), NotifyError> {
        let phone = owner_ref.trim();
        if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NotifyError::InvalidRecipient(owner_ref.to_string()));
        }

        let body = message.trim();
        let len = body.chars().count();
        if len == 0 || len > MAX_MESSAGE_LEN {
            return Err(NotifyError::InvalidMessage { len, max: MAX_MESSAGE_LEN });
        }

        let to = format!("+1{phone}");
        let form = [("From", self.from_phone.as_str()), ("To", to.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Twilio accepted message to {} ({})", to, status);
            return Ok(());
        }

        let message = match response.json::<ApiError>().await {
            Ok(error) => error.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        Err(NotifyError::Rejected { status: status.as_u16(), message })
    }
}
