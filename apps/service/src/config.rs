use std::{env, fmt, fs, io, path};

use logger::LogFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notify::twilio::DEFAULT_API_BASE;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {}: {source}", .path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to write config {}: {source}", .path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to parse config {}: {source}", .path.display())]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no config path available: neither XDG_CONFIG_HOME nor a home directory is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub worker: WorkerConfig,
    pub store: StoreConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Seconds between the start of two check cycles
    pub interval_seconds: u64,
    /// Cap on concurrently running check pipelines, unbounded when unset
    pub max_concurrent_probes: Option<usize>,
    /// Skip a check whose pipeline from an earlier cycle is still running
    pub skip_in_flight: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { interval_seconds: 60, max_concurrent_probes: None, skip_in_flight: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one `<id>.json` file per check
    pub data_dir: path::PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: path::PathBuf::from(".data/checks") }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Twilio,
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierKind::Log => write!(f, "log"),
            NotifierKind::Twilio => write!(f, "twilio"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub twilio: TwilioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Falls back to `RUST_LOG_FORMAT` when unset
    pub format: Option<LogFormat>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/upwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("upwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        let max_probes = self
            .worker
            .max_concurrent_probes
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string());
        let log_format = self
            .logging
            .format
            .map_or_else(|| "from RUST_LOG_FORMAT".to_string(), |format| format.to_string());

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Worker")?;
        write_1(f, "Interval (s)", &self.worker.interval_seconds)?;
        write_1(f, "Max Concurrent Probes", &max_probes)?;
        write_1(f, "Skip In-Flight Checks", &self.worker.skip_in_flight)?;
        write_title_1(f, "Store")?;
        write_1(f, "Data Directory", &self.store.data_dir.display())?;
        write_title_1(f, "Notifier")?;
        write_1(f, "Kind", &self.notifier.kind)?;
        if self.notifier.kind == NotifierKind::Twilio {
            write_1(f, "Account SID", &self.notifier.twilio.account_sid)?;
            write_1(f, "From", &self.notifier.twilio.from_phone)?;
            write_1(f, "API Base", &self.notifier.twilio.api_base)?;
        }
        write_title_1(f, "Logging")?;
        write_1(f, "Format", &log_format)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/upwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| Error::ParseFailed { path: config_path.clone(), source })?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.worker.interval_seconds == 0 {
            return Err(Error::Invalid("worker.interval_seconds must be at least 1".into()));
        }
        if self.worker.max_concurrent_probes == Some(0) {
            return Err(Error::Invalid("worker.max_concurrent_probes must be at least 1".into()));
        }
        if self.notifier.kind == NotifierKind::Twilio {
            let twilio = &self.notifier.twilio;
            if twilio.account_sid.is_empty()
                || twilio.auth_token.is_empty()
                || twilio.from_phone.is_empty()
            {
                return Err(Error::Invalid(
                    "notifier.twilio needs account_sid, auth_token and from_phone".into(),
                ));
            }
        }
        Ok(())
    }
}
