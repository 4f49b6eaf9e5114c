//! Device inventory records and loaders.
//!
//! The sweep only needs an ordered list of [`DeviceRecord`]s. They come either
//! from the `devices` array of the sweep file or from a plain hosts file with
//! one address per line.

use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::Platform;

/// Opaque handle naming an entry in the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sweep target. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRecord {
    /// Management address (IP or resolvable hostname).
    pub address: String,

    /// Friendly name used in logs and the summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Platform the inventory believes the device runs.
    #[serde(default, rename = "platform", skip_serializing_if = "Option::is_none")]
    pub platform_hint: Option<Platform>,

    /// SSH port override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub credential: CredentialRef,
}

impl DeviceRecord {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            platform_hint: None,
            port: None,
            credential: CredentialRef::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_credential(mut self, credential: CredentialRef) -> Self {
        self.credential = credential;
        self
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Parse a hosts file body.
///
/// Each non-blank line is `address [name]`; text after `#` is ignored.
pub fn parse_hosts(text: &str, credential: &CredentialRef) -> Vec<DeviceRecord> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            let address = fields.next().unwrap_or_default();
            let mut record = DeviceRecord::new(address).with_credential(credential.clone());
            if let Some(name) = fields.next() {
                record = record.with_name(name);
            }
            record
        })
        .collect()
}

/// Load a hosts file, assigning every device the same credential.
pub fn load_hosts_file(
    path: impl AsRef<Path>,
    credential: &CredentialRef,
) -> Result<Vec<DeviceRecord>, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let devices = parse_hosts(&text, credential);
    debug!("Loaded {} devices from {}", devices.len(), path.display());
    Ok(devices)
}
