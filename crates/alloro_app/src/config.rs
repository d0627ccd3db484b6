//! Configuration for the `alloro` binary.
//!
//! Settings come from an optional RON file (`./alloro.ron` or `--config`);
//! every field is optional and command-line flags win over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloro_engine::{EngineSettings, Role, SessionContext};
use alloro_logging::{LevelFilter, LogDestination};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "alloro.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unknown role {0:?} (expected admin or user)")]
    Role(String),
    #[error("unknown log destination {0:?} (expected terminal, file, both or off)")]
    LogDestination(String),
    #[error("unknown log level {0:?}")]
    LogLevel(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub role: Option<String>,
    pub account_id: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub billing_max_attempts: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub log: Option<String>,
    pub log_level: Option<String>,
    /// The file these values were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub role: Option<String>,
    pub account_id: Option<String>,
    pub log: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub engine: EngineSettings,
    pub session: SessionContext,
    pub log: LogDestination,
    pub log_level: LevelFilter,
}

/// Reads `path`, or `./alloro.ron` when no path is given. Only an explicit
/// path is required to exist.
pub fn load(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.clone(),
        message: err.to_string(),
    })?;
    Ok(FileConfig {
        source: Some(path),
        ..config
    })
}

impl FileConfig {
    pub fn resolve(self, overrides: Overrides) -> Result<ResolvedConfig, ConfigError> {
        let mut engine = EngineSettings::default();
        if let Some(base_url) = overrides.base_url.or(self.base_url) {
            engine.api.base_url = base_url;
        }
        if let Some(secs) = self.connect_timeout_secs {
            engine.api.connect_timeout =
                Duration::from_secs(non_zero(secs, "connect_timeout_secs")?);
        }
        if let Some(secs) = self.request_timeout_secs {
            engine.api.request_timeout =
                Duration::from_secs(non_zero(secs, "request_timeout_secs")?);
        }
        if let Some(ms) = self.poll_interval_ms {
            let interval = Duration::from_millis(non_zero(ms, "poll_interval_ms")?);
            engine.ranking_poll.interval = interval;
            engine.billing_poll.interval = interval;
        }
        if let Some(max) = self.billing_max_attempts {
            if max == 0 {
                return Err(ConfigError::Zero("billing_max_attempts"));
            }
            engine.billing_poll.max_attempts = Some(max);
        }

        let role = match overrides.role.or(self.role) {
            Some(raw) => Some(Role::parse(&raw).ok_or(ConfigError::Role(raw))?),
            None => None,
        };
        let session = SessionContext::new(
            overrides.token.or(self.token),
            role,
            overrides.account_id.or(self.account_id),
        );

        let log = match overrides.log.or(self.log) {
            Some(raw) => {
                LogDestination::parse(&raw).ok_or(ConfigError::LogDestination(raw))?
            }
            None => LogDestination::File(PathBuf::from(alloro_logging::DEFAULT_LOG_FILE)),
        };
        let log_level = match overrides.log_level.or(self.log_level) {
            Some(raw) => raw
                .trim()
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::LogLevel(raw))?,
            None => LevelFilter::Info,
        };

        Ok(ResolvedConfig {
            engine,
            session,
            log,
            log_level,
        })
    }
}

fn non_zero(value: u64, name: &'static str) -> Result<u64, ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero(name))
    } else {
        Ok(value)
    }
}
