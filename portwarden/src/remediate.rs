//! Per-interface remediation.
//!
//! Each interface gets the profile's configuration sequence in one
//! `send_config` call, followed by the optional verification command. The
//! first failure stops the device: records for interfaces already handled are
//! kept untouched and the rest are reported as not attempted.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::Timeouts;
use crate::error::SessionError;
use crate::extract::InterfaceSet;
use crate::platform::CommandProfile;
use crate::transport::{Session, timed};

/// Audit entry for one remediated interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationRecord {
    pub interface: String,

    /// Configuration lines sent.
    pub commands: Vec<String>,

    /// Text the device returned for the configuration sequence.
    pub output: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
}

/// Step at which remediation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configure => f.write_str("configuring"),
            Stage::Verify => f.write_str("verifying"),
        }
    }
}

/// Why remediation stopped before the last interface.
#[derive(Debug)]
pub struct Interruption {
    pub interface: String,
    pub stage: Stage,
    pub error: SessionError,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.stage, self.interface, self.error)
    }
}

/// Result of remediating one device.
#[derive(Debug, Default)]
pub struct RemediationReport {
    /// One record per interface whose sequence was applied, in order.
    pub records: Vec<RemediationRecord>,

    pub interruption: Option<Interruption>,
}

impl RemediationReport {
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }

    pub fn remediated(&self) -> Vec<String> {
        self.records.iter().map(|r| r.interface.clone()).collect()
    }

    /// Interfaces from `found` that have no record.
    pub fn not_attempted(&self, found: &InterfaceSet) -> Vec<String> {
        found
            .iter()
            .filter(|name| !self.records.iter().any(|r| r.interface == *name))
            .map(str::to_string)
            .collect()
    }
}

/// Apply `profile`'s remediation sequence to every interface in order.
///
/// Configuration calls are bounded by the config timeout and verification by
/// the command timeout. Nothing is retried.
pub async fn remediate<S>(
    session: &mut S,
    interfaces: &InterfaceSet,
    profile: &CommandProfile,
    timeouts: &Timeouts,
    device: &str,
) -> RemediationReport
where
    S: Session + ?Sized,
{
    let mut report = RemediationReport::default();

    for interface in interfaces {
        let commands = profile.remediation_lines(interface);
        debug!("{}: remediating {} ({} lines)", device, interface, commands.len());

        let output = match timed(timeouts.config(), session.send_config(&commands)).await {
            Ok(output) => output,
            Err(error) => {
                warn!("{}: remediation of {} failed: {}", device, interface, error);
                report.interruption = Some(Interruption {
                    interface: interface.to_string(),
                    stage: Stage::Configure,
                    error,
                });
                break;
            }
        };

        let mut record = RemediationRecord {
            interface: interface.to_string(),
            commands,
            output,
            verification: None,
        };

        if let Some(command) = profile.verify_line(interface) {
            match timed(timeouts.command(), session.send_command(&command)).await {
                Ok(status) => record.verification = Some(status),
                Err(error) => {
                    warn!("{}: verification of {} failed: {}", device, interface, error);
                    report.records.push(record);
                    report.interruption = Some(Interruption {
                        interface: interface.to_string(),
                        stage: Stage::Verify,
                        error,
                    });
                    break;
                }
            }
        }

        info!("{}: remediated {}", device, interface);
        report.records.push(record);
    }

    report
}
