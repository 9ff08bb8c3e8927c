use async_trait::async_trait;
use reqwest::redirect::Policy;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::types::{CheckSpec, Method, ProbeOutcome};
use crate::shutdown::Shutdown;

/// Issues the single outbound request a check gets per cycle
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `check` once and resolve to exactly one outcome.
    ///
    /// Returns `None` when shutdown fired before the probe resolved.
    async fn probe(&self, check: &CheckSpec, shutdown: &mut Shutdown) -> Option<ProbeOutcome>;
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Redirects are not followed: a 301 is an outcome like any other status.
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("upwatch/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, check: &CheckSpec, shutdown: &mut Shutdown) -> Option<ProbeOutcome> {
        let url = match Url::parse(&check.endpoint()) {
            Ok(url) => url,
            Err(e) => return Some(ProbeOutcome::network_error(format!("invalid endpoint: {e}"))),
        };

        let request = self.client.request(http_method(check.method), url).send();

        // Whichever branch finishes first decides the outcome; the others are dropped.
        tokio::select! {
            biased;

            _ = shutdown.triggered() => {
                debug!("Probe of {} abandoned on shutdown", check.endpoint());
                None
            }
            result = request => Some(match result {
                Ok(response) => ProbeOutcome::response(response.status().as_u16()),
                Err(e) if e.is_timeout() => ProbeOutcome::timeout(),
                Err(e) => ProbeOutcome::network_error(error_chain(&e)),
            }),
            _ = sleep(check.timeout()) => Some(ProbeOutcome::timeout()),
        }
    }
}

/// reqwest's Display stops at the outermost error; the cause is usually further down
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
