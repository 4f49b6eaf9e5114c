//! Scripted in-memory transport for orchestrator tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Session, SessionTransport};
use crate::error::{ConnectFailure, ConnectFailureKind, SessionError};
use crate::inventory::DeviceRecord;
use crate::platform::VERSION_COMMAND;

/// How one scripted device behaves.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceScript {
    /// Fail `open` with this kind instead of connecting.
    pub refuse: Option<ConnectFailureKind>,

    /// Delay before `open` returns.
    pub connect_delay: Duration,

    /// Delay before every command and config call.
    pub call_delay: Duration,

    pub version: String,

    /// Command to output; unknown commands return an empty string.
    pub outputs: HashMap<String, String>,

    /// Number of `send_config` calls that succeed before the session drops.
    pub config_budget: Option<usize>,

    /// Reject config calls whose lines mention this text.
    pub reject_line: Option<String>,

    /// Commands answered with a device error.
    pub failing_commands: Vec<String>,

    /// Panic inside `open` with this message.
    pub panic_on_open: Option<String>,
}

impl DeviceScript {
    pub fn banner(version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn refusing(kind: ConnectFailureKind) -> Self {
        Self {
            refuse: Some(kind),
            ..Default::default()
        }
    }

    pub fn panicking(message: &str) -> Self {
        Self {
            panic_on_open: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn output(mut self, command: &str, text: &str) -> Self {
        self.outputs.insert(command.to_string(), text.to_string());
        self
    }

    pub fn config_budget(mut self, calls: usize) -> Self {
        self.config_budget = Some(calls);
        self
    }

    pub fn reject_line(mut self, text: &str) -> Self {
        self.reject_line = Some(text.to_string());
        self
    }

    pub fn fail_command(mut self, command: &str) -> Self {
        self.failing_commands.push(command.to_string());
        self
    }

    pub fn call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }
}

/// Where a scripted transport fires its cancellation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CancelPoint {
    /// Once this many sessions have been opened.
    Opens(usize),
    /// When this command is sent.
    Command(String),
    /// On the first `send_config` of any session.
    FirstConfig,
}

#[derive(Debug, Default)]
struct Shared {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    config_log: Mutex<Vec<(String, Vec<String>)>>,
}

/// Transport keyed by device address.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    scripts: HashMap<String, DeviceScript>,
    shared: Arc<Shared>,
    cancel_at: Option<(CancelPoint, CancellationToken)>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(mut self, address: &str, script: DeviceScript) -> Self {
        self.scripts.insert(address.to_string(), script);
        self
    }

    pub fn cancel_at(mut self, point: CancelPoint, token: CancellationToken) -> Self {
        self.cancel_at = Some((point, token));
        self
    }

    /// Highest number of sessions open at the same time.
    pub fn peak_open(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Config lines sent to `address`, one entry per `send_config` call.
    pub fn config_calls(&self, address: &str) -> Vec<Vec<String>> {
        self.shared
            .config_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, lines)| lines.clone())
            .collect()
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn open(&self, device: &DeviceRecord) -> Result<ScriptedSession, ConnectFailure> {
        let script = self
            .scripts
            .get(&device.address)
            .cloned()
            .unwrap_or_default();

        tokio::time::sleep(script.connect_delay).await;
        if let Some(message) = &script.panic_on_open {
            panic!("{message}");
        }
        if let Some(kind) = script.refuse {
            return Err(ConnectFailure::new(kind, &device.address, "scripted refusal"));
        }

        let now = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak.fetch_max(now, Ordering::SeqCst);
        let opened = self.shared.opened.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((CancelPoint::Opens(after), token)) = &self.cancel_at {
            if opened >= *after {
                token.cancel();
            }
        }

        Ok(ScriptedSession {
            address: device.address.clone(),
            script,
            config_calls: 0,
            shared: self.shared.clone(),
            cancel_at: self.cancel_at.clone(),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedSession {
    address: String,
    script: DeviceScript,
    config_calls: usize,
    shared: Arc<Shared>,
    cancel_at: Option<(CancelPoint, CancellationToken)>,
    closed: bool,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        tokio::time::sleep(self.script.call_delay).await;
        if let Some((CancelPoint::Command(trigger), token)) = &self.cancel_at {
            if trigger == command {
                token.cancel();
            }
        }
        if self.script.failing_commands.iter().any(|c| c == command) {
            return Err(SessionError::Rejected {
                command: command.to_string(),
                message: "% Invalid input detected at '^' marker.".to_string(),
            });
        }
        if command == VERSION_COMMAND {
            return Ok(self.script.version.clone());
        }
        Ok(self.script.outputs.get(command).cloned().unwrap_or_default())
    }

    async fn send_config(&mut self, lines: &[String]) -> Result<String, SessionError> {
        tokio::time::sleep(self.script.call_delay).await;
        if let Some((CancelPoint::FirstConfig, token)) = &self.cancel_at {
            token.cancel();
        }
        if self.script.config_budget.is_some_and(|budget| self.config_calls >= budget) {
            return Err(SessionError::Closed);
        }
        if let Some(bad) = &self.script.reject_line {
            if let Some(line) = lines.iter().find(|l| l.contains(bad.as_str())) {
                return Err(SessionError::Rejected {
                    command: line.clone(),
                    message: "% Invalid input detected at '^' marker.".to_string(),
                });
            }
        }

        self.config_calls += 1;
        self.shared
            .config_log
            .lock()
            .unwrap()
            .push((self.address.clone(), lines.to_vec()));
        Ok(format!("{}\n", lines.join("\n")))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.closed {
            self.closed = true;
            self.shared.open.fetch_sub(1, Ordering::SeqCst);
            self.shared.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
