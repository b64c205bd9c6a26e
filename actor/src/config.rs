//! Actor configuration
//!
//! Settings are read from the CLI's JSON config file and overlaid with the
//! `CF_*` environment variables. The actor itself only sees the read-only
//! [`Config`] trait.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ActorError;
use crate::logs::LogLevel;

/// Default timeout for application staging
pub const DEFAULT_STAGING_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default timeout for application starting
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default time between consecutive polls of a status
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(3);

/// Default time allowed for the log server to (re)connect
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only configuration consumed by the actor
pub trait Config: Send + Sync {
    /// Upper bound on waiting for a build to stage
    fn staging_timeout(&self) -> Duration;

    /// Upper bound on waiting for processes to start
    fn startup_timeout(&self) -> Duration;

    /// Delay between two status requests
    fn polling_interval(&self) -> Duration;

    /// Time allowed for the log stream to reconnect after a retry error
    fn dial_timeout(&self) -> Duration;

    /// Token used to authenticate against the log stream
    fn access_token(&self) -> &SecretString;
}

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    /// Cloud Controller API endpoint
    #[serde(default)]
    pub target: String,

    /// OAuth access token, optionally prefixed with `bearer `
    #[serde(default, skip_serializing)]
    pub access_token: String,

    /// Skip TLS certificate validation
    #[serde(default, rename = "SSLDisabled")]
    pub skip_ssl_validation: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Staging timeout in minutes
    #[serde(default = "default_staging_timeout_mins")]
    pub staging_timeout_mins: u64,

    /// Startup timeout in minutes
    #[serde(default = "default_startup_timeout_mins")]
    pub startup_timeout_mins: u64,

    /// Polling interval in seconds
    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,

    /// Dial timeout in seconds
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,
}

fn default_staging_timeout_mins() -> u64 {
    DEFAULT_STAGING_TIMEOUT.as_secs() / 60
}

fn default_startup_timeout_mins() -> u64 {
    DEFAULT_STARTUP_TIMEOUT.as_secs() / 60
}

fn default_polling_interval_secs() -> u64 {
    DEFAULT_POLLING_INTERVAL.as_secs()
}

fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT.as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: String::new(),
            access_token: String::new(),
            skip_ssl_validation: false,
            log_level: LogLevel::default(),
            staging_timeout_mins: default_staging_timeout_mins(),
            startup_timeout_mins: default_startup_timeout_mins(),
            polling_interval_secs: default_polling_interval_secs(),
            dial_timeout_secs: default_dial_timeout_secs(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; a missing file yields the defaults.
    /// Any other read failure is an error.
    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Overlay values from `CF_*` environment variables.
    ///
    /// Unparseable numbers are ignored and the file value is kept.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |name: &str| -> Option<u64> {
            let raw = lookup(name)?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid value for {}: {}", name, raw);
                    None
                }
            }
        };

        if let Some(mins) = number("CF_STAGING_TIMEOUT") {
            self.staging_timeout_mins = mins;
        }
        if let Some(mins) = number("CF_STARTUP_TIMEOUT") {
            self.startup_timeout_mins = mins;
        }
        if let Some(secs) = number("CF_POLLING_INTERVAL") {
            self.polling_interval_secs = secs;
        }
        if let Some(secs) = number("CF_DIAL_TIMEOUT") {
            self.dial_timeout_secs = secs;
        }
        if let Some(token) = lookup("CF_ACCESS_TOKEN") {
            self.access_token = token;
        }
        if let Some(level) = lookup("CF_LOG_LEVEL").and_then(|l| l.parse().ok()) {
            self.log_level = level;
        }
    }
}

/// Location of the CLI config file: `$CF_HOME/.cf/config.json`, falling back
/// to the home directory
pub fn default_settings_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let home = lookup("CF_HOME")
        .or_else(|| lookup("HOME"))
        .unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".cf").join("config.json")
}

/// Configuration resolved from [`Settings`]
#[derive(Debug)]
pub struct ActorConfig {
    target: String,
    skip_ssl_validation: bool,
    log_level: LogLevel,
    staging_timeout: Duration,
    startup_timeout: Duration,
    polling_interval: Duration,
    dial_timeout: Duration,
    access_token: SecretString,
}

impl ActorConfig {
    pub fn from_settings(settings: Settings) -> Self {
        let token = settings
            .access_token
            .strip_prefix("bearer ")
            .unwrap_or(&settings.access_token)
            .to_string();

        Self {
            target: settings.target,
            skip_ssl_validation: settings.skip_ssl_validation,
            log_level: settings.log_level,
            staging_timeout: Duration::from_secs(settings.staging_timeout_mins.saturating_mul(60)),
            startup_timeout: Duration::from_secs(settings.startup_timeout_mins.saturating_mul(60)),
            polling_interval: Duration::from_secs(settings.polling_interval_secs),
            dial_timeout: Duration::from_secs(settings.dial_timeout_secs),
            access_token: SecretString::from(token),
        }
    }

    /// Load the settings file and apply the process environment
    pub async fn load(path: &Path) -> Result<Self, ActorError> {
        let mut settings = Settings::read(path).await?;
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(Self::from_settings(settings))
    }

    /// Cloud Controller API endpoint
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn skip_ssl_validation(&self) -> bool {
        self.skip_ssl_validation
    }

    pub fn log_level(&self) -> &LogLevel {
        &self.log_level
    }
}

impl Config for ActorConfig {
    fn staging_timeout(&self) -> Duration {
        self.staging_timeout
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    fn access_token(&self) -> &SecretString {
        &self.access_token
    }
}
