//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every failure the conductor surfaces as an
/// error rather than as [`RunResult`](crate::models::run::RunResult) data.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Request incompatible with the engine's capabilities.
    Usage(String),
    /// Transport selected for an engine has no implementation.
    TransportNotImplemented(String),
    /// Engine name did not resolve to a known engine.
    UnknownEngine(String),
    /// A command was constructed with no argv tokens.
    InvalidCommand(String),
    /// Child process could not be started for a reason other than a
    /// missing binary.
    Spawn(String),
    /// Session store read or write failure.
    Session(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Usage(msg) => write!(f, "usage: {msg}"),
            Self::TransportNotImplemented(msg) => write!(f, "transport not implemented: {msg}"),
            Self::UnknownEngine(msg) => write!(f, "unknown engine: {msg}"),
            Self::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Session(msg) => write!(f, "session store: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
