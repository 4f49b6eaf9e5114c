//! Fleet orchestration.
//!
//! Every device is processed by its own task. A semaphore bounds the number
//! of sessions open at once, and results are placed back into inventory order
//! whatever order the tasks finish in.
//!
//! Per device the worker walks
//! `Pending → Connecting → Connected → Classified → Diagnosed → Remediated → Done`,
//! leaving early for `Skipped` or `Failed`. Nothing is retried within a run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::Timeouts;
use crate::extract::extract;
use crate::inventory::DeviceRecord;
use crate::platform::{ProfileRegistry, VERSION_COMMAND, classify};
use crate::remediate::remediate;
use crate::report::{DeviceRunResult, FailureKind, Outcome, RunSummary, SkipReason};
use crate::transport::{Session, SessionTransport, timed};

/// Progress of one device through the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Pending,
    Connecting,
    Connected,
    Classified,
    Diagnosed,
    Remediated,
    Done,
    Skipped,
    Failed,
}

impl DeviceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeviceState::Done | DeviceState::Skipped | DeviceState::Failed)
    }

    /// Whether `next` is a legal transition from this state.
    pub fn can_advance_to(&self, next: DeviceState) -> bool {
        use DeviceState::*;
        match (self, next) {
            (Pending, Connecting) | (Pending, Skipped) => true,
            (Connecting, Connected) | (Connecting, Failed) => true,
            (Connected, Classified) | (Connected, Skipped) | (Connected, Failed) => true,
            (Classified, Diagnosed) | (Classified, Skipped) | (Classified, Failed) => true,
            (Diagnosed, Remediated) | (Diagnosed, Skipped) => true,
            (Remediated, Done) | (Remediated, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Pending => "PENDING",
            DeviceState::Connecting => "CONNECTING",
            DeviceState::Connected => "CONNECTED",
            DeviceState::Classified => "CLASSIFIED",
            DeviceState::Diagnosed => "DIAGNOSED",
            DeviceState::Remediated => "REMEDIATED",
            DeviceState::Done => "DONE",
            DeviceState::Skipped => "SKIPPED",
            DeviceState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Tracks and logs one device's state transitions.
struct Progress<'a> {
    device: &'a str,
    state: DeviceState,
}

impl<'a> Progress<'a> {
    fn new(device: &'a str) -> Self {
        Self {
            device,
            state: DeviceState::Pending,
        }
    }

    fn advance(&mut self, next: DeviceState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("{}: {} -> {}", self.device, self.state, next);
        self.state = next;
    }

    /// Move to the terminal state matching `result`.
    fn finish(&mut self, result: DeviceRunResult) -> DeviceRunResult {
        let terminal = match result.outcome {
            Outcome::Done => DeviceState::Done,
            Outcome::Skipped { .. } => DeviceState::Skipped,
            Outcome::Failed { .. } => DeviceState::Failed,
        };
        self.advance(terminal);
        result
    }
}

/// Drives the sweep across the inventory.
pub struct Fleet<T: SessionTransport> {
    transport: Arc<T>,
    registry: Arc<ProfileRegistry>,
    timeouts: Timeouts,
    concurrency: usize,
}

impl<T: SessionTransport> Fleet<T> {
    pub fn new(transport: Arc<T>, registry: Arc<ProfileRegistry>) -> Self {
        Self {
            transport,
            registry,
            timeouts: Timeouts::default(),
            concurrency: 8,
        }
    }

    /// Maximum sessions open at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sweep `devices` and return one result per device, in inventory order.
    ///
    /// Once `cancel` fires no new sessions are opened; devices still waiting
    /// for a slot are skipped and in-flight devices stop at their next step
    /// boundary.
    pub async fn run(&self, devices: &[DeviceRecord], cancel: CancellationToken) -> RunSummary {
        info!(
            "Sweeping {} devices with up to {} concurrent sessions",
            devices.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<DeviceRunResult> = JoinSet::new();
        let mut owners: HashMap<task::Id, usize> = HashMap::with_capacity(devices.len());

        for (index, device) in devices.iter().cloned().enumerate() {
            let worker = Worker {
                transport: Arc::clone(&self.transport),
                registry: Arc::clone(&self.registry),
                timeouts: self.timeouts,
                cancel: cancel.clone(),
            };
            let semaphore = Arc::clone(&semaphore);

            let handle = tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = worker.cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };

                match permit {
                    Some(_permit) => worker.process(device).await,
                    None => {
                        info!("{}: skipped, sweep cancelled", device);
                        DeviceRunResult::skipped(device, SkipReason::Cancelled)
                    }
                }
            });
            owners.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<DeviceRunResult>> = vec![None; devices.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(&index) = owners.get(&id) {
                        slots[index] = Some(result);
                    }
                }
                Err(e) => {
                    let id = e.id();
                    let cause = abort_cause(e);
                    match owners.get(&id) {
                        Some(&index) => {
                            let device = &devices[index];
                            error!("{}: device worker aborted: {}", device, cause);
                            slots[index] = Some(DeviceRunResult::failed(
                                device.clone(),
                                FailureKind::Unexpected,
                                format!("device worker aborted: {cause}"),
                            ));
                        }
                        None => error!("Device worker aborted: {}", cause),
                    }
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(devices)
            .map(|(slot, device)| {
                slot.unwrap_or_else(|| {
                    DeviceRunResult::failed(
                        device.clone(),
                        FailureKind::Unexpected,
                        "device worker produced no result",
                    )
                })
            })
            .collect();

        RunSummary::new(results, cancel.is_cancelled())
    }
}

/// Panic message or cancellation reason of a failed worker task.
fn abort_cause(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Everything one device task needs.
struct Worker<T: SessionTransport> {
    transport: Arc<T>,
    registry: Arc<ProfileRegistry>,
    timeouts: Timeouts,
    cancel: CancellationToken,
}

impl<T: SessionTransport> Worker<T> {
    async fn process(&self, device: DeviceRecord) -> DeviceRunResult {
        let label = device.to_string();
        let mut progress = Progress::new(&label);

        progress.advance(DeviceState::Connecting);
        let opened = tokio::time::timeout(self.timeouts.connect(), self.transport.open(&device)).await;
        let mut session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(failure)) => {
                warn!("{}: connect failed: {}", label, failure);
                let result = DeviceRunResult::failed(device, failure.kind.into(), failure.message);
                return progress.finish(result);
            }
            Err(_) => {
                warn!("{}: connect timed out", label);
                let result = DeviceRunResult::failed(
                    device,
                    FailureKind::Unreachable,
                    format!("connect timed out after {:?}", self.timeouts.connect()),
                );
                return progress.finish(result);
            }
        };
        progress.advance(DeviceState::Connected);

        let result = self.drive(device, &mut session, &mut progress).await;

        if let Err(e) = timed(self.timeouts.command(), session.close()).await {
            debug!("{}: close failed: {}", label, e);
        }
        progress.finish(result)
    }

    /// Classify, diagnose, and remediate over an open session.
    async fn drive(
        &self,
        device: DeviceRecord,
        session: &mut T::Session,
        progress: &mut Progress<'_>,
    ) -> DeviceRunResult {
        let label = device.to_string();

        if self.cancel.is_cancelled() {
            return DeviceRunResult::skipped(device, SkipReason::Cancelled);
        }

        let banner = match timed(self.timeouts.command(), session.send_command(VERSION_COMMAND)).await
        {
            Ok(banner) => banner,
            Err(e) => {
                warn!("{}: '{}' failed: {}", label, VERSION_COMMAND, e);
                return DeviceRunResult::failed(device, FailureKind::Session, e.to_string());
            }
        };

        let platform = classify(&banner);
        if let Some(hint) = device.platform_hint {
            if hint != platform {
                warn!("{}: inventory says {} but device reports {}", label, hint, platform);
            }
        }
        progress.advance(DeviceState::Classified);

        let Some(profile) = self.registry.profile_for(platform) else {
            info!("{}: unsupported platform, skipping", label);
            return DeviceRunResult::skipped(device, SkipReason::Unsupported).with_platform(platform);
        };
        debug!("{}: classified as {}", label, platform);

        if self.cancel.is_cancelled() {
            return DeviceRunResult::skipped(device, SkipReason::Cancelled).with_platform(platform);
        }

        let output = match timed(
            self.timeouts.command(),
            session.send_command(&profile.diagnostic_command),
        )
        .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("{}: diagnostic failed: {}", label, e);
                return DeviceRunResult::failed(device, FailureKind::Session, e.to_string())
                    .with_platform(platform);
            }
        };

        let found = extract(&output, &profile.interface_pattern);
        progress.advance(DeviceState::Diagnosed);
        if found.is_empty() {
            info!("{}: no anomalous interfaces", label);
        } else {
            info!("{}: {} anomalous interfaces: {:?}", label, found.len(), found.to_vec());
        }

        if self.cancel.is_cancelled() {
            return DeviceRunResult::skipped(device, SkipReason::Cancelled)
                .with_platform(platform)
                .with_found(found);
        }

        let report = remediate(session, &found, profile, &self.timeouts, &label).await;
        progress.advance(DeviceState::Remediated);

        let mut result = match &report.interruption {
            None => DeviceRunResult::done(device),
            Some(interruption) => {
                DeviceRunResult::failed(device, FailureKind::Partial, interruption.to_string())
            }
        }
        .with_platform(platform);
        result.interfaces_remediated = report.remediated();
        result.interfaces_not_attempted = report.not_attempted(&found);
        result.interfaces_found = found;
        result.audit = report.records;
        result
    }
}
