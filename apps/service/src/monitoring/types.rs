use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Scheme used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// HTTP verb a check is probed with. Stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "get" => Some(Method::Get),
            "post" => Some(Method::Post),
            "put" => Some(Method::Put),
            "delete" => Some(Method::Delete),
            _ => None,
        }
    }

    /// Wire form of the verb, e.g. `GET`
    pub fn as_upper(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upper())
    }
}

/// Classified reachability of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    Down,
}

impl CheckState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "up" => Some(CheckState::Up),
            "down" => Some(CheckState::Down),
            _ => None,
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// A validated check record.
///
/// Field names on disk follow the record format written by the API layer, so
/// `owner_ref` is stored as `userPhone`, `target` as `url` and
/// `timeout_budget` as `timeoutSeconds`. Keys this worker does not know about
/// are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpec {
    pub id: String,

    /// Who gets alerted on a transition
    #[serde(rename = "userPhone")]
    pub owner_ref: String,

    pub protocol: Protocol,

    /// Hostname plus optional path and query, without scheme
    #[serde(rename = "url")]
    pub target: String,

    pub method: Method,

    pub success_codes: Vec<u16>,

    /// Probe timeout in whole seconds
    #[serde(rename = "timeoutSeconds")]
    pub timeout_budget: u64,

    /// `None` until the check has been observed once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CheckState>,

    /// Milliseconds since the Unix epoch of the last processed probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckSpec {
    /// Full URL the probe is sent to
    pub fn endpoint(&self) -> String {
        format!("{}://{}", self.protocol, self.target)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_budget)
    }

    /// True when no probe of this check has ever been processed
    pub fn is_first_observation(&self) -> bool {
        self.last_checked.is_none()
    }
}

/// Why a probe did not produce a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Network(String),
    Timeout,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Network(detail) => write!(f, "network error: {detail}"),
            ProbeFailure::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of a single probe. Either a status code or a failure, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub failure: Option<ProbeFailure>,
    pub status_code: Option<u16>,
}

impl ProbeOutcome {
    /// A response was received
    pub fn response(status_code: u16) -> Self {
        Self { failure: None, status_code: Some(status_code) }
    }

    /// The transport failed before a response arrived
    pub fn network_error(detail: impl Into<String>) -> Self {
        Self { failure: Some(ProbeFailure::Network(detail.into())), status_code: None }
    }

    /// The timeout budget ran out first
    pub fn timeout() -> Self {
        Self { failure: Some(ProbeFailure::Timeout), status_code: None }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.failure, self.status_code) {
            (Some(failure), _) => write!(f, "{failure}"),
            (None, Some(code)) => write!(f, "status {code}"),
            (None, None) => write!(f, "no response"),
        }
    }
}
