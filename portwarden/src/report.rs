//! Per-device results and the run summary.

use std::fmt;

use log::info;
use serde::Serialize;

use crate::error::ConnectFailureKind;
use crate::extract::InterfaceSet;
use crate::inventory::DeviceRecord;
use crate::platform::Platform;
use crate::remediate::RemediationRecord;

/// Why a device was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Classified as [`Platform::Unknown`].
    Unsupported,
    /// The run was cancelled before the device finished.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unsupported => f.write_str("unsupported"),
            SkipReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Classification of a failed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unreachable,
    Authentication,
    Protocol,
    /// A command failed before remediation began.
    Session,
    /// Remediation stopped part way.
    Partial,
    /// Anything else, caught at the worker boundary.
    Unexpected,
}

impl From<ConnectFailureKind> for FailureKind {
    fn from(kind: ConnectFailureKind) -> Self {
        match kind {
            ConnectFailureKind::Unreachable => FailureKind::Unreachable,
            ConnectFailureKind::Authentication => FailureKind::Authentication,
            ConnectFailureKind::Protocol => FailureKind::Protocol,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Authentication => "authentication",
            FailureKind::Protocol => "protocol",
            FailureKind::Session => "session",
            FailureKind::Partial => "partial",
            FailureKind::Unexpected => "unexpected",
        };
        f.write_str(s)
    }
}

/// Terminal state of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Skipped { reason: SkipReason },
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Done => f.write_str("DONE"),
            Outcome::Skipped { reason } => write!(f, "SKIPPED: {reason}"),
            Outcome::Failed { kind, message } => write!(f, "FAILED: {kind} ({message})"),
        }
    }
}

/// Outcome record for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRunResult {
    pub device: DeviceRecord,

    /// `None` when the device was never classified.
    pub platform: Option<Platform>,

    #[serde(flatten)]
    pub outcome: Outcome,

    pub interfaces_found: InterfaceSet,

    pub interfaces_remediated: Vec<String>,

    pub interfaces_not_attempted: Vec<String>,

    /// Per-interface transcripts.
    pub audit: Vec<RemediationRecord>,
}

impl DeviceRunResult {
    fn new(device: DeviceRecord, outcome: Outcome) -> Self {
        Self {
            device,
            platform: None,
            outcome,
            interfaces_found: InterfaceSet::new(),
            interfaces_remediated: Vec::new(),
            interfaces_not_attempted: Vec::new(),
            audit: Vec::new(),
        }
    }

    pub fn done(device: DeviceRecord) -> Self {
        Self::new(device, Outcome::Done)
    }

    pub fn skipped(device: DeviceRecord, reason: SkipReason) -> Self {
        Self::new(device, Outcome::Skipped { reason })
    }

    pub fn failed(device: DeviceRecord, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(
            device,
            Outcome::Failed {
                kind,
                message: message.into(),
            },
        )
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Record discovered interfaces; all start out not attempted.
    pub fn with_found(mut self, found: InterfaceSet) -> Self {
        self.interfaces_not_attempted = found.to_vec();
        self.interfaces_found = found;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.outcome.is_failed()
    }
}

impl fmt::Display for DeviceRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let platform = self.platform.unwrap_or(Platform::Unknown);
        write!(
            f,
            "{} [{}] {}: found {}, remediated {}",
            self.device,
            platform,
            self.outcome,
            self.interfaces_found.len(),
            self.interfaces_remediated.len()
        )?;
        if !self.interfaces_not_attempted.is_empty() {
            write!(f, ", not attempted {}", self.interfaces_not_attempted.len())?;
        }
        Ok(())
    }
}

/// Device counts by terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Final artifact of one sweep: one result per device, in inventory order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cancelled: bool,
    pub counts: Counts,
    pub devices: Vec<DeviceRunResult>,
}

impl RunSummary {
    pub fn new(devices: Vec<DeviceRunResult>, cancelled: bool) -> Self {
        let counts = devices.iter().fold(Counts::default(), |mut c, d| {
            match d.outcome {
                Outcome::Done => c.done += 1,
                Outcome::Skipped { .. } => c.skipped += 1,
                Outcome::Failed { .. } => c.failed += 1,
            }
            c
        });
        Self {
            cancelled,
            counts,
            devices,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    /// 130 when interrupted, 1 when any device failed, otherwise 0.
    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            130
        } else if self.has_failures() {
            1
        } else {
            0
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Log one line per device, then the totals.
    pub fn log_digest(&self) {
        for device in &self.devices {
            info!("{}", device);
        }
        info!(
            "Sweep finished: {} done, {} skipped, {} failed{}",
            self.counts.done,
            self.counts.skipped,
            self.counts.failed,
            if self.cancelled { " (interrupted)" } else { "" }
        );
    }
}
