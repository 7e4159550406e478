//! Conductor settings parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::engine::BuildContext;
use crate::models::Transport;
use crate::stream::DEFAULT_MAX_FRAME_BYTES;
use crate::{AppError, Result};

fn default_logs_root() -> PathBuf {
    PathBuf::from(".agent-conductor").join("logs")
}

fn default_sessions_file() -> PathBuf {
    PathBuf::from(".agent-conductor").join("sessions.json")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_true() -> bool {
    true
}

fn default_grace_period_seconds() -> u64 {
    3
}

fn default_long_prompt_bytes() -> usize {
    16 * 1024
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

/// Settings parsed from `config.toml`. Every field has a default, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// Root directory for per-run diagnostic logs.
    #[serde(default = "default_logs_root")]
    pub logs_root: PathBuf,
    /// JSON document holding the last session id per engine.
    #[serde(default = "default_sessions_file")]
    pub sessions_file: PathBuf,
    /// Directory for temporary prompt files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Bypass permission prompts unless a run opts out.
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    /// Request stream-json output unless a run opts out.
    #[serde(default = "default_true")]
    pub stream_json: bool,
    /// Transport for `qwen`; only `cmdline` is implemented.
    #[serde(default)]
    pub qwen_transport: Transport,
    /// Seconds between the terminate signal and a forced kill.
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,
    /// Prompts longer than this go through a temp file for engines that
    /// cannot read stdin.
    #[serde(default = "default_long_prompt_bytes")]
    pub long_prompt_bytes: usize,
    /// Largest stream-json line kept; longer lines are dropped and logged.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logs_root: default_logs_root(),
            sessions_file: default_sessions_file(),
            temp_dir: default_temp_dir(),
            dangerously_skip_permissions: false,
            stream_json: true,
            qwen_transport: Transport::default(),
            grace_period_seconds: default_grace_period_seconds(),
            long_prompt_bytes: default_long_prompt_bytes(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Load settings from `path` when it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an existing file is invalid.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from_path(path),
            Some(path) => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Grace period between terminate and kill.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    /// Resolved context handed to the command builder.
    #[must_use]
    pub fn build_context(&self) -> BuildContext {
        BuildContext {
            transport: self.qwen_transport,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.grace_period_seconds == 0 {
            return Err(AppError::Config(
                "grace_period_seconds must be greater than zero".into(),
            ));
        }
        if self.long_prompt_bytes == 0 {
            return Err(AppError::Config(
                "long_prompt_bytes must be greater than zero".into(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(AppError::Config(
                "max_frame_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
