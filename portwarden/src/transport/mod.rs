//! Session transport boundary and its SSH implementation.
//!
//! The orchestrator only sees the [`SessionTransport`] and [`Session`]
//! traits. [`SshTransport`] implements them over russh with a PTY shell;
//! tests plug in a scripted transport instead.

pub mod config;
mod ssh;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{AuthMethod, HostKeyVerification, SshConfig, SshSettings};
pub use ssh::{SshSession, SshTransport};

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConnectFailure, SessionError};
use crate::inventory::DeviceRecord;

/// An open, prompt-based command session to one device.
///
/// Owned by exactly one device worker for its whole lifetime.
#[async_trait]
pub trait Session: Send {
    /// Run an exec-mode command and return its text output.
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Enter configuration mode, send `lines` in order, leave, and return
    /// the transcript.
    async fn send_config(&mut self, lines: &[String]) -> Result<String, SessionError>;

    /// Close the session.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Factory for device sessions.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    type Session: Session + 'static;

    /// Open and authenticate a session to `device`.
    async fn open(&self, device: &DeviceRecord) -> Result<Self::Session, ConnectFailure>;
}

/// Bound a session call by `limit`; expiry becomes [`SessionError::Timeout`].
pub async fn timed<T, F>(limit: Duration, call: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| SessionError::Timeout(limit))?
}
