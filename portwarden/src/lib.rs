//! # Portwarden
//!
//! Fleet sweep that finds anomalous switch ports over SSH CLI sessions and
//! applies a remediation sequence to each of them.
//!
//! For every device in the inventory the sweep opens a session, reads
//! `show version` to decide the dialect, runs the dialect's diagnostic command,
//! extracts the interface names from its free-text output, and pushes the
//! configured sequence to each interface. Results are collected into a
//! [`RunSummary`] in inventory order.
//!
//! ## Features
//!
//! - Cisco IOS / IOS-XE, Cisco NX-OS, and Dell OS9 dialects
//! - Recover (bounce err-disabled ports) and harden (tag and shut unused ports) intents
//! - Bounded concurrency with cooperative cancellation
//! - Per-device failure isolation and a JSON run summary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use portwarden::{Fleet, SshTransport, SweepConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portwarden::Error> {
//!     let config = SweepConfig::load("sweep.json")?;
//!     config.validate()?;
//!     let registry = Arc::new(config.registry()?);
//!     let devices = config.devices.clone();
//!     let timeouts = config.timeouts;
//!     let concurrency = config.concurrency;
//!
//!     let transport = Arc::new(SshTransport::new(Arc::new(config)));
//!     let summary = Fleet::new(transport, registry)
//!         .with_concurrency(concurrency)
//!         .with_timeouts(timeouts)
//!         .run(&devices, CancellationToken::new())
//!         .await;
//!
//!     println!("{}", summary.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod extract;
pub mod fleet;
pub mod inventory;
pub mod platform;
pub mod remediate;
pub mod report;
pub mod transport;

// Re-export main types for convenience
pub use config::{Credential, SweepConfig, Timeouts};
pub use error::{ConfigError, ConnectFailure, ConnectFailureKind, Error, SessionError};
pub use extract::{InterfacePattern, InterfaceSet, extract};
pub use fleet::{DeviceState, Fleet};
pub use inventory::{CredentialRef, DeviceRecord};
pub use platform::{CommandProfile, Intent, Platform, ProfileRegistry, classify};
pub use remediate::{RemediationRecord, remediate};
pub use report::{DeviceRunResult, FailureKind, Outcome, RunSummary, SkipReason};
pub use transport::{Session, SessionTransport, SshTransport};
