use std::{env::var, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Install the global subscriber.
///
/// `format` wins over the `RUST_LOG_FORMAT` environment variable. Calling this
/// more than once is harmless; later calls leave the first subscriber in place.
pub fn init(format: Option<LogFormat>) {
    initialize_tracing(LevelFilter::INFO, format);
}

fn initialize_tracing(level: LevelFilter, format: Option<LogFormat>) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let (log_format, env_warning) = match format {
        Some(format) => (format, None),
        None => format_from_env(),
    };

    let log_layer = match log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => {
            tracing_subscriber::fmt::layer().compact().with_filter(env_filter).boxed()
        }
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_ok() {
        if let Some(warning) = env_warning {
            warn!("Failed to read RUST_LOG_FORMAT, falling back to compact: {warning}");
        }
    }
}

fn format_from_env() -> (LogFormat, Option<String>) {
    match var("RUST_LOG_FORMAT") {
        Ok(raw) => match raw.parse() {
            Ok(format) => (format, None),
            Err(error) => (LogFormat::default(), Some(error)),
        },
        Err(_) => (LogFormat::default(), None),
    }
}
