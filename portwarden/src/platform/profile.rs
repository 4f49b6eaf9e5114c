//! Command profiles and the static registry that binds them to platforms.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Platform, vendors};
use crate::error::ConfigError;
use crate::extract::InterfacePattern;

/// Placeholder substituted with the interface name in line templates.
pub const INTERFACE_PLACEHOLDER: &str = "{interface}";

/// What the sweep is trying to achieve on each anomalous port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Bounce err-disabled ports back into service.
    #[default]
    Recover,
    /// Tag and shut unused or transceiver-less ports.
    Harden,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Recover => f.write_str("recover"),
            Intent::Harden => f.write_str("harden"),
        }
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recover" | "recovery" => Ok(Intent::Recover),
            "harden" | "hardening" => Ok(Intent::Harden),
            other => Err(format!("unknown intent '{other}' (expected recover or harden)")),
        }
    }
}

/// Caller-chosen remediation policy used to build the built-in profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationPolicy {
    pub intent: Intent,

    /// Description applied to ports shut by [`Intent::Harden`].
    pub description_tag: String,

    /// Issue the per-interface status command after remediation.
    pub verify: bool,
}

impl Default for RemediationPolicy {
    fn default() -> Self {
        Self {
            intent: Intent::Recover,
            description_tag: "UNUSED".to_string(),
            verify: true,
        }
    }
}

/// A configuration or command line with an `{interface}` slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineTemplate(String);

impl LineTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mentions_interface(&self) -> bool {
        self.0.contains(INTERFACE_PLACEHOLDER)
    }

    /// Substitute the interface name.
    pub fn render(&self, interface: &str) -> String {
        self.0.replace(INTERFACE_PLACEHOLDER, interface)
    }
}

impl From<&str> for LineTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Everything needed to diagnose and remediate one platform.
#[derive(Debug, Clone)]
pub struct CommandProfile {
    pub platform: Platform,

    /// Command whose output lists the anomalous interfaces.
    pub diagnostic_command: String,

    /// Grammar of interface names in the diagnostic output.
    pub interface_pattern: InterfacePattern,

    /// Configuration lines applied to each interface, in order.
    pub remediation_sequence: Vec<LineTemplate>,

    /// Optional post-remediation status command, kept for audit.
    pub verify_command: Option<LineTemplate>,
}

impl CommandProfile {
    /// Create a profile; the remediation sequence must address the interface.
    pub fn new(
        platform: Platform,
        diagnostic_command: impl Into<String>,
        interface_pattern: InterfacePattern,
        remediation_sequence: Vec<LineTemplate>,
    ) -> Result<Self, ConfigError> {
        if !platform.is_supported() {
            return Err(ConfigError::invalid("the unknown platform has no profile"));
        }
        let profile = Self {
            platform,
            diagnostic_command: diagnostic_command.into(),
            interface_pattern,
            remediation_sequence,
            verify_command: None,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Set the verification command.
    pub fn with_verify(mut self, template: impl Into<LineTemplate>) -> Self {
        self.verify_command = Some(template.into());
        self
    }

    /// Render the remediation lines for one interface.
    pub fn remediation_lines(&self, interface: &str) -> Vec<String> {
        self.remediation_sequence
            .iter()
            .map(|line| line.render(interface))
            .collect()
    }

    /// Render the verification command for one interface.
    pub fn verify_line(&self, interface: &str) -> Option<String> {
        self.verify_command.as_ref().map(|t| t.render(interface))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.diagnostic_command.trim().is_empty() {
            return Err(ConfigError::invalid(format!(
                "{} profile has an empty diagnostic command",
                self.platform
            )));
        }
        if !self
            .remediation_sequence
            .iter()
            .any(LineTemplate::mentions_interface)
        {
            return Err(ConfigError::invalid(format!(
                "{} remediation sequence never references {INTERFACE_PLACEHOLDER}",
                self.platform
            )));
        }
        Ok(())
    }

    fn apply(mut self, overrides: &ProfileOverride) -> Result<Self, ConfigError> {
        if let Some(command) = &overrides.diagnostic_command {
            self.diagnostic_command = command.clone();
        }
        if let Some(pattern) = &overrides.interface_pattern {
            self.interface_pattern = InterfacePattern::new(pattern)?;
        }
        if let Some(lines) = &overrides.remediation {
            self.remediation_sequence = lines.iter().map(|l| LineTemplate::new(l.as_str())).collect();
        }
        if let Some(verify) = &overrides.verify_command {
            self.verify_command = (!verify.is_empty()).then(|| LineTemplate::new(verify.as_str()));
        }
        self.validate()?;
        Ok(self)
    }
}

/// Per-platform overrides read from the sweep file.
///
/// An empty `verify_command` disables verification for that platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileOverride {
    pub diagnostic_command: Option<String>,
    pub interface_pattern: Option<String>,
    pub remediation: Option<Vec<String>>,
    pub verify_command: Option<String>,
}

/// Static table of command profiles, one per supported platform.
///
/// Built once at startup and shared read-only by every device worker.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    ios: CommandProfile,
    nxos: CommandProfile,
    dell_os9: CommandProfile,
}

impl ProfileRegistry {
    /// Build the vendor tables for the given policy.
    pub fn builtin(policy: &RemediationPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            ios: vendors::cisco_ios::profile(policy)?,
            nxos: vendors::cisco_nxos::profile(policy)?,
            dell_os9: vendors::dell_os9::profile(policy)?,
        })
    }

    /// Replace parts of one platform's profile.
    pub fn with_override(
        mut self,
        platform: Platform,
        overrides: &ProfileOverride,
    ) -> Result<Self, ConfigError> {
        let slot = self.slot_mut(platform).ok_or_else(|| {
            ConfigError::invalid("cannot override the profile of the unknown platform")
        })?;
        *slot = slot.clone().apply(overrides)?;
        debug!("Applied profile override for {}", platform);
        Ok(self)
    }

    /// Profile for a platform; `None` only for [`Platform::Unknown`].
    pub fn profile_for(&self, platform: Platform) -> Option<&CommandProfile> {
        match platform {
            Platform::Ios => Some(&self.ios),
            Platform::Nxos => Some(&self.nxos),
            Platform::DellOs9 => Some(&self.dell_os9),
            Platform::Unknown => None,
        }
    }

    fn slot_mut(&mut self, platform: Platform) -> Option<&mut CommandProfile> {
        match platform {
            Platform::Ios => Some(&mut self.ios),
            Platform::Nxos => Some(&mut self.nxos),
            Platform::DellOs9 => Some(&mut self.dell_os9),
            Platform::Unknown => None,
        }
    }

    /// Iterate over all profiles.
    pub fn iter(&self) -> impl Iterator<Item = &CommandProfile> {
        [&self.ios, &self.nxos, &self.dell_os9].into_iter()
    }
}
