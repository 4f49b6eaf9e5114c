//! Error types for portwarden.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for portwarden operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure while opening a device session
    #[error("Connect failure: {0}")]
    Connect(#[from] ConnectFailure),

    /// Failure on an already-open session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration or inventory errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing the run summary failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a session could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailureKind {
    /// Host did not answer, refused the connection, or the connect timed out.
    Unreachable,
    /// Credentials were rejected or could not be resolved.
    Authentication,
    /// SSH handshake, host key, or prompt negotiation went wrong.
    Protocol,
}

impl std::fmt::Display for ConnectFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable => write!(f, "unreachable"),
            Self::Authentication => write!(f, "authentication"),
            Self::Protocol => write!(f, "protocol"),
        }
    }
}

/// Open-time failure raised by a session transport.
#[derive(Error, Debug)]
#[error("{kind} failure for {address}: {message}")]
pub struct ConnectFailure {
    pub kind: ConnectFailureKind,
    pub address: String,
    pub message: String,
}

impl ConnectFailure {
    pub fn new(
        kind: ConnectFailureKind,
        address: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ConnectFailureKind::Unreachable, address, message)
    }

    pub fn authentication(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ConnectFailureKind::Authentication, address, message)
    }

    pub fn protocol(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ConnectFailureKind::Protocol, address, message)
    }

    /// Connect attempt exceeded its deadline.
    pub fn timeout(address: impl Into<String>, after: Duration) -> Self {
        Self::unreachable(address, format!("connect timed out after {after:?}"))
    }
}

/// Errors on an open session (command or configuration exchange).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation did not complete in time
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Channel or connection closed by the peer
    #[error("Session closed")]
    Closed,

    /// Device answered with an error marker
    #[error("Device rejected '{command}': {message}")]
    Rejected { command: String, message: String },

    /// SSH protocol error on the channel
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Configuration, inventory, and profile errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not read a file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File content is not valid JSON for the expected shape
    #[error("Failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid built-in or user-supplied regex
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Result type alias using portwarden's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_timeout_is_unreachable() {
        let failure = ConnectFailure::timeout("10.0.0.1", Duration::from_secs(5));
        assert_eq!(failure.kind, ConnectFailureKind::Unreachable);
        assert!(failure.to_string().contains("10.0.0.1"));
        assert!(failure.to_string().starts_with("unreachable"));
    }

    #[test]
    fn test_error_wraps_layers() {
        let err: Error = SessionError::Closed.into();
        assert_eq!(err.to_string(), "Session error: Session closed");

        let err: Error = ConfigError::invalid("concurrency must be at least 1").into();
        assert!(err.to_string().contains("concurrency"));
    }
}
