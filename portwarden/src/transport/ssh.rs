//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, warn};
use regex::bytes::Regex;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::{Session, SessionTransport};
use crate::channel::prompt::{self, PromptPatterns};
use crate::channel::PatternBuffer;
use crate::config::SweepConfig;
use crate::error::{ConnectFailure, SessionError};
use crate::inventory::DeviceRecord;

/// Opens [`SshSession`]s using the sweep's credentials and SSH settings.
pub struct SshTransport {
    config: Arc<SweepConfig>,
}

impl SshTransport {
    pub fn new(config: Arc<SweepConfig>) -> Self {
        Self { config }
    }

    /// Resolve the device's credential reference into connection parameters.
    fn resolve(&self, device: &DeviceRecord) -> Result<SshConfig, ConnectFailure> {
        let credential = self.config.credential(&device.credential).ok_or_else(|| {
            ConnectFailure::authentication(
                &device.address,
                format!("no credential named '{}'", device.credential),
            )
        })?;
        let auth = credential
            .auth_method()
            .map_err(|e| ConnectFailure::authentication(&device.address, e.to_string()))?;

        Ok(SshConfig {
            host: device.address.clone(),
            port: device.port.unwrap_or(self.config.ssh.port),
            username: credential.username.clone(),
            auth,
            enable_secret: credential.enable_secret(),
            connect_timeout: self.config.timeouts.connect(),
            read_timeout: self.config.timeouts.command(),
            settings: self.config.ssh.clone(),
        })
    }
}

#[async_trait]
impl SessionTransport for SshTransport {
    type Session = SshSession;

    async fn open(&self, device: &DeviceRecord) -> Result<SshSession, ConnectFailure> {
        let config = self.resolve(device)?;
        SshSession::connect(config).await
    }
}

/// Interactive PTY shell on one device.
pub struct SshSession {
    /// The russh session handle.
    session: Handle<SshHandler>,

    channel: Channel<Msg>,

    buffer: PatternBuffer,

    patterns: PromptPatterns,

    host: String,

    read_timeout: Duration,

    /// Last prompt seen, e.g. `sw1#`.
    prompt: String,
}

impl SshSession {
    /// Connect, authenticate, open a shell, and settle at a privileged prompt.
    pub async fn connect(config: SshConfig) -> Result<Self, ConnectFailure> {
        let host = config.host.clone();
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.read_timeout * 4),
            ..Default::default()
        });

        let rejection: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.settings.host_key_verification.clone(),
            known_hosts_path: config.settings.known_hosts_path.clone(),
            rejection: rejection.clone(),
        };

        debug!("Connecting to {}:{}", config.host, config.port);
        let mut session = tokio::time::timeout(
            config.connect_timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| ConnectFailure::timeout(&host, config.connect_timeout))?
        .map_err(|e| {
            let host_key = rejection.lock().ok().and_then(|mut slot| slot.take());
            match host_key {
                Some(message) => ConnectFailure::protocol(&host, message),
                None => classify_ssh_error(&host, e),
            }
        })?;

        tokio::time::timeout(config.connect_timeout, authenticate(&mut session, &config))
            .await
            .map_err(|_| ConnectFailure::timeout(&host, config.connect_timeout))??;

        let channel = open_shell(&session, &config)
            .await
            .map_err(|e| ConnectFailure::protocol(&host, e.to_string()))?;

        let patterns = PromptPatterns::new()
            .map_err(|e| ConnectFailure::protocol(&host, e.to_string()))?;

        let mut this = Self {
            session,
            channel,
            buffer: PatternBuffer::new(config.settings.search_depth),
            patterns,
            host,
            read_timeout: config.read_timeout,
            prompt: String::new(),
        };

        this.settle(&config)
            .await
            .map_err(|e| ConnectFailure::protocol(&this.host, e.to_string()))?;
        Ok(this)
    }

    /// Wait for the first prompt, escalate if needed, disable paging.
    async fn settle(&mut self, config: &SshConfig) -> Result<(), SessionError> {
        let prompt_pattern = self.patterns.prompt.clone();
        let banner = self.read_until(&prompt_pattern).await?;
        self.prompt = prompt::last_line(&banner);
        debug!("{}: initial prompt '{}'", self.host, self.prompt);

        if prompt::is_user_exec(&self.prompt) {
            match &config.enable_secret {
                Some(secret) => {
                    let password_pattern = self.patterns.password.clone();
                    self.write_line("enable").await?;
                    self.read_until(&password_pattern).await?;
                    self.write_line(secret.expose_secret()).await?;
                    let raw = self.read_until(&prompt_pattern).await?;
                    self.prompt = prompt::last_line(&raw);
                    if prompt::is_user_exec(&self.prompt) {
                        return Err(SessionError::Rejected {
                            command: "enable".to_string(),
                            message: "still in user exec after enable".to_string(),
                        });
                    }
                }
                None => warn!(
                    "{}: landed in user exec and no enable secret is configured",
                    self.host
                ),
            }
        }

        self.send_command("terminal length 0").await?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        let payload = format!("{line}\n");
        self.channel.data(payload.as_bytes()).await?;
        Ok(())
    }

    /// Read until `pattern` appears in the buffer tail.
    async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>, SessionError> {
        let deadline = tokio::time::Instant::now() + self.read_timeout;
        loop {
            if let Some(end) = self.buffer.search_tail(pattern) {
                return Ok(self.buffer.split_to(end));
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| SessionError::Timeout(self.read_timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    trace!("{}: read {} bytes", self.host, data.len());
                    self.buffer.extend(&data);
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::Closed);
                }
                Some(other) => trace!("{}: ignoring {:?}", self.host, other),
            }
        }
    }

    /// Send one line and return the raw text up to and including the next prompt.
    async fn exchange(&mut self, line: &str) -> Result<Vec<u8>, SessionError> {
        self.write_line(line).await?;
        let prompt_pattern = self.patterns.prompt.clone();
        let raw = self.read_until(&prompt_pattern).await?;
        self.prompt = prompt::last_line(&raw);
        Ok(raw)
    }
}

#[async_trait]
impl Session for SshSession {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        debug!("{}: {}", self.host, command);
        let raw = self.exchange(command).await?;
        let result = prompt::normalize_output(&raw, command);

        if let Some(message) = prompt::detect_failure(&result) {
            return Err(SessionError::Rejected {
                command: command.to_string(),
                message,
            });
        }
        Ok(result)
    }

    async fn send_config(&mut self, lines: &[String]) -> Result<String, SessionError> {
        let mut transcript = String::new();
        let enter = self.exchange("configure terminal").await?;
        transcript.push_str(&String::from_utf8_lossy(&enter));

        for line in lines {
            debug!("{}: config: {}", self.host, line);
            let raw = self.exchange(line).await?;
            let text = String::from_utf8_lossy(&raw).replace('\r', "");
            transcript.push_str(&text);

            if let Some(message) = prompt::detect_failure(&text) {
                // Leave config mode before reporting
                if let Err(e) = self.exchange("end").await {
                    warn!("{}: failed to leave config mode: {}", self.host, e);
                }
                return Err(SessionError::Rejected {
                    command: line.clone(),
                    message,
                });
            }
        }

        let leave = self.exchange("end").await?;
        transcript.push_str(&String::from_utf8_lossy(&leave));
        Ok(transcript.replace('\r', ""))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

async fn authenticate(
    session: &mut Handle<SshHandler>,
    config: &SshConfig,
) -> Result<(), ConnectFailure> {
    let host = config.host.as_str();
    let success = match &config.auth {
        AuthMethod::Password(password) => session
            .authenticate_password(&config.username, password.expose_secret())
            .await
            .map_err(|e| classify_ssh_error(host, e))?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| ConnectFailure::authentication(host, e.to_string()))?;

            // Best RSA hash algorithm the server supports
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(|e| classify_ssh_error(host, e))?
                .flatten();

            session
                .authenticate_publickey(
                    &config.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
                .map_err(|e| classify_ssh_error(host, e))?
                .success()
        }
    };

    if !success {
        return Err(ConnectFailure::authentication(
            host,
            format!("authentication failed for user '{}'", config.username),
        ));
    }
    Ok(())
}

async fn open_shell(
    session: &Handle<SshHandler>,
    config: &SshConfig,
) -> Result<Channel<Msg>, russh::Error> {
    let channel = session.channel_open_session().await?;
    channel
        .request_pty(
            true,
            "xterm",
            config.settings.terminal_width,
            config.settings.terminal_height,
            0,
            0,
            &[],
        )
        .await?;
    channel.request_shell(true).await?;
    Ok(channel)
}

/// Map a russh error raised before the shell is up.
fn classify_ssh_error(host: &str, error: russh::Error) -> ConnectFailure {
    match error {
        russh::Error::IO(e) => ConnectFailure::unreachable(host, e.to_string()),
        russh::Error::ConnectionTimeout => ConnectFailure::unreachable(host, "connection timed out"),
        other => ConnectFailure::protocol(host, other.to_string()),
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key rejection, surfaced by `connect` instead of
    /// russh's generic error.
    rejection: Arc<Mutex<Option<String>>>,
}

impl SshHandler {
    /// `Ok(true)` when known, `Ok(false)` when the host is new.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, String> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(format!(
                "host key for {}:{} changed (known_hosts line {})",
                self.host, self.port, line
            )),
            Err(e) => Err(format!("known_hosts check failed: {e}")),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) {
        let result = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };
        if let Err(e) = result {
            warn!("Failed to save host key for {}: {}", self.host, e);
        }
    }

    fn reject(&self, message: String) -> bool {
        if let Ok(mut slot) = self.rejection.lock() {
            *slot = Some(message);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,
            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    self.learn_host_key(server_public_key);
                    true
                }
                Err(message) => self.reject(message),
            },
            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(format!(
                    "host {}:{} is not in known_hosts",
                    self.host, self.port
                )),
                Err(message) => self.reject(message),
            },
        };
        Ok(accepted)
    }
}
