use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const LEDGER_FILE_NAME: &str = "all.workflow.database.tsv";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to resolve home directory for cromrun state root")]
    HomeDirectoryUnavailable,
    #[error("invalid value `{value}` for {name}: {reason}")]
    InvalidOverride {
        name: String,
        value: String,
        reason: String,
    },
}

/// Immutable process-wide configuration, constructed once at entry and passed
/// by reference into every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    server_url: String,
    ledger_path: PathBuf,
    state_root: PathBuf,
    timeout: Duration,
}

impl Config {
    pub fn new(server_url: impl Into<String>, state_root: impl Into<PathBuf>) -> Self {
        let state_root = state_root.into();
        Self {
            server_url: server_url.into(),
            ledger_path: state_root.join(LEDGER_FILE_NAME),
            state_root,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let state_root = match std::env::var("CROMRUN_HOME") {
            Ok(value) if !value.is_empty() => PathBuf::from(value),
            _ => default_state_root()?,
        };
        let server_url = match std::env::var("CROMRUN_SERVER") {
            Ok(value) if !value.is_empty() => value,
            _ => DEFAULT_SERVER_URL.to_string(),
        };
        let mut config = Self::new(server_url, state_root);
        if let Ok(value) = std::env::var("CROMRUN_LEDGER") {
            if !value.is_empty() {
                config.ledger_path = PathBuf::from(value);
            }
        }
        if let Ok(value) = std::env::var("CROMRUN_TIMEOUT_SECONDS") {
            if !value.is_empty() {
                let seconds: u64 =
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidOverride {
                            name: "CROMRUN_TIMEOUT_SECONDS".to_string(),
                            value: value.clone(),
                            reason: "must be a whole number of seconds".to_string(),
                        })?;
                config.timeout = Duration::from_secs(seconds);
            }
        }
        Ok(config)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn default_state_root() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(Path::new(&home).join(".cromrun"))
}
