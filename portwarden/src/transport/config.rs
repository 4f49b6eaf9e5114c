//! SSH connection settings.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. Lab use only.
    Disabled,
}

/// Fleet-wide SSH settings from the sweep file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshSettings {
    /// Default SSH port.
    pub port: u16,

    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts; the user's default file when unset.
    pub known_hosts_path: Option<PathBuf>,

    /// PTY dimensions. A wide terminal keeps status tables on one line.
    pub terminal_width: u32,
    pub terminal_height: u32,

    /// Bytes from the end of the buffer searched for a prompt.
    pub search_depth: usize,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            host_key_verification: HostKeyVerification::AcceptNew,
            known_hosts_path: None,
            terminal_width: 511,
            terminal_height: 24,
            search_depth: 1000,
        }
    }
}

/// Fully resolved parameters for one connection.
#[derive(Debug)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,
    pub enable_secret: Option<SecretString>,

    /// Deadline for TCP connect, handshake, and authentication.
    pub connect_timeout: Duration,

    /// Deadline for each prompt read.
    pub read_timeout: Duration,

    pub settings: SshSettings,
}

/// Authentication method for SSH connections.
#[derive(Debug)]
pub enum AuthMethod {
    Password(SecretString),

    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}
