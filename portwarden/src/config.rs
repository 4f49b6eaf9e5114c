//! Sweep configuration.
//!
//! The sweep file is JSON. It is read once at startup into an immutable
//! [`SweepConfig`], which is then shared behind an `Arc` by the transport and
//! the orchestrator.
//!
//! ```json
//! {
//!   "concurrency": 16,
//!   "intent": "harden",
//!   "description_tag": "LIVRE",
//!   "timeouts": { "connect_secs": 10 },
//!   "credentials": {
//!     "default": { "username": "netops", "password_env": "PORTWARDEN_PASSWORD" }
//!   },
//!   "devices": [
//!     { "address": "10.10.0.11", "name": "sw-access-01", "platform": "ios" }
//!   ],
//!   "profiles": {
//!     "nxos": { "verify_command": "" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::inventory::{CredentialRef, DeviceRecord};
use crate::platform::{Intent, Platform, ProfileOverride, ProfileRegistry, RemediationPolicy};
use crate::transport::config::{AuthMethod, SshSettings};

/// Per-call deadlines applied to every session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub connect_secs: u64,
    pub command_secs: u64,
    pub config_secs: u64,
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn config(&self) -> Duration {
        Duration::from_secs(self.config_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 15,
            command_secs: 30,
            config_secs: 60,
        }
    }
}

/// Login material for one credential reference.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credential {
    pub username: String,

    #[serde(default)]
    pub password: Option<SecretString>,

    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,

    #[serde(default)]
    pub private_key: Option<PathBuf>,

    #[serde(default)]
    pub passphrase: Option<SecretString>,

    /// Secret for `enable` when the device lands in user exec.
    #[serde(default)]
    pub enable_secret: Option<SecretString>,
}

impl Credential {
    /// Password login.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(SecretString::from(password.into())),
            password_env: None,
            private_key: None,
            passphrase: None,
            enable_secret: None,
        }
    }

    /// Resolve the authentication method. Keys win over passwords.
    pub fn auth_method(&self) -> Result<AuthMethod, ConfigError> {
        if let Some(path) = &self.private_key {
            return Ok(AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: self.passphrase.as_ref().map(copy_secret),
            });
        }
        if let Some(password) = &self.password {
            return Ok(AuthMethod::Password(copy_secret(password)));
        }
        if let Some(var) = &self.password_env {
            let value = std::env::var(var).map_err(|_| {
                ConfigError::invalid(format!("environment variable {var} is not set"))
            })?;
            return Ok(AuthMethod::Password(SecretString::from(value)));
        }
        Err(ConfigError::invalid(format!(
            "credential for '{}' has no password, password_env, or private_key",
            self.username
        )))
    }

    pub fn enable_secret(&self) -> Option<SecretString> {
        self.enable_secret.as_ref().map(copy_secret)
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// Immutable sweep configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Maximum number of concurrently open device sessions.
    pub concurrency: usize,

    pub timeouts: Timeouts,

    pub intent: Intent,

    /// Description written on ports shut by the harden intent.
    pub description_tag: String,

    /// Capture per-interface status after remediation.
    pub verify: bool,

    pub ssh: SshSettings,

    pub credentials: BTreeMap<String, Credential>,

    /// Inline inventory.
    pub devices: Vec<DeviceRecord>,

    pub profiles: BTreeMap<Platform, ProfileOverride>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeouts: Timeouts::default(),
            intent: Intent::Recover,
            description_tag: "UNUSED".to_string(),
            verify: true,
            ssh: SshSettings::default(),
            credentials: BTreeMap::new(),
            devices: Vec::new(),
            profiles: BTreeMap::new(),
        }
    }
}

impl SweepConfig {
    /// Read and parse a sweep file. Call [`validate`](Self::validate) once the
    /// inventory is final.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parse sweep JSON; `what` names the source in errors.
    pub fn from_json(content: &str, what: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            what: what.to_string(),
            source,
        })
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::invalid("concurrency must be at least 1"));
        }
        if self.timeouts.connect_secs == 0
            || self.timeouts.command_secs == 0
            || self.timeouts.config_secs == 0
        {
            return Err(ConfigError::invalid("timeouts must be greater than zero"));
        }
        for device in &self.devices {
            if device.address.trim().is_empty() {
                return Err(ConfigError::invalid("device with an empty address"));
            }
            if !self.credentials.contains_key(device.credential.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "device {} references unknown credential '{}'",
                    device, device.credential
                )));
            }
        }
        Ok(())
    }

    pub fn credential(&self, reference: &CredentialRef) -> Option<&Credential> {
        self.credentials.get(reference.as_str())
    }

    pub fn policy(&self) -> RemediationPolicy {
        RemediationPolicy {
            intent: self.intent,
            description_tag: self.description_tag.clone(),
            verify: self.verify,
        }
    }

    /// Build the profile table with this file's overrides applied.
    pub fn registry(&self) -> Result<ProfileRegistry, ConfigError> {
        self.profiles
            .iter()
            .try_fold(ProfileRegistry::builtin(&self.policy())?, |registry, (platform, o)| {
                registry.with_override(*platform, o)
            })
    }
}
