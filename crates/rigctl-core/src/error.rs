use rigctl_types::Motor;
use std::time::Duration;
use thiserror::Error;

/// Failures of the remote session itself, independent of what was asked of it.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Session not connected")]
    NotConnected,

    #[error("Connection to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Command execution failed: {0}")]
    Exec(String),

    #[error("Transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("{operation} timed out after {}s", after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Position query failed for {motor}: {reason}")]
    QueryFailed { motor: Motor, reason: String },

    #[error("Move of {motor} to {angle} failed: {reason}")]
    MoveFailed {
        motor: Motor,
        angle: f64,
        reason: String,
    },

    #[error("Invalid angle: {0}")]
    InvalidAngle(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Command failed with exit status {status}: {command}")]
    CommandFailed { command: String, status: i32 },

    #[error("Unexpected output from '{command}': {output}")]
    UnexpectedOutput { command: String, output: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stable category of an [`Error`], for callers that branch on outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    QueryFailed,
    MoveFailed,
    InvalidAngle,
    ConfigParse,
    UnknownDevice,
    InvalidOperation,
    CommandFailed,
    Config,
    Io,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::QueryFailed => "query-failed",
            ErrorKind::MoveFailed => "move-failed",
            ErrorKind::InvalidAngle => "invalid-angle",
            ErrorKind::ConfigParse => "config-parse",
            ErrorKind::UnknownDevice => "unknown-device",
            ErrorKind::InvalidOperation => "invalid-operation",
            ErrorKind::CommandFailed => "command-failed",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::QueryFailed { .. } => ErrorKind::QueryFailed,
            Error::MoveFailed { .. } => ErrorKind::MoveFailed,
            Error::InvalidAngle(_) => ErrorKind::InvalidAngle,
            Error::ConfigParse(_) | Error::Json(_) => ErrorKind::ConfigParse,
            Error::UnknownDevice(_) => ErrorKind::UnknownDevice,
            Error::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Error::CommandFailed { .. } | Error::UnexpectedOutput { .. } => {
                ErrorKind::CommandFailed
            }
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the error came from a session call that ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
