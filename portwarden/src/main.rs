use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use portwarden::inventory::load_hosts_file;
use portwarden::{CredentialRef, Error, Fleet, Intent, RunSummary, SshTransport, SweepConfig};

/// Exit status for configuration and startup errors.
const EXIT_CONFIG: u8 = 2;

/// Portwarden - sweep a switch fleet for err-disabled or unused ports and remediate them
#[derive(Parser, Debug)]
#[command(name = "portwarden")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the JSON sweep file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hosts file replacing the sweep file's device list (one `address [name]` per line)
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Credential reference used for devices read from --inventory
    #[arg(long, default_value = "default")]
    credential: String,

    /// Maximum number of concurrently open sessions
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Remediation intent: recover or harden
    #[arg(long)]
    intent: Option<Intent>,

    /// Write the JSON summary here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging (state transitions and every command sent)
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match sweep(config).await {
        Ok(summary) => ExitCode::from(publish(&summary, cli.output.as_deref())),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

/// Build the final configuration: sweep file first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<SweepConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => SweepConfig::load(path)?,
        None => SweepConfig::default(),
    };

    if let Some(path) = &cli.inventory {
        config.devices = load_hosts_file(path, &CredentialRef::new(&cli.credential))?;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(intent) = cli.intent {
        config.intent = intent;
    }

    config.validate()?;
    if config.devices.is_empty() {
        warn!("Inventory is empty, nothing to sweep");
    }
    Ok(config)
}

async fn sweep(config: SweepConfig) -> Result<RunSummary, Error> {
    let registry = Arc::new(config.registry()?);
    let devices = config.devices.clone();
    let timeouts = config.timeouts;
    let concurrency = config.concurrency;
    info!(
        "Intent {}, {} devices, concurrency {}",
        config.intent,
        devices.len(),
        concurrency
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight steps and skipping the rest");
            signal_token.cancel();
        }
    });

    let transport = Arc::new(SshTransport::new(Arc::new(config)));
    let summary = Fleet::new(transport, registry)
        .with_concurrency(concurrency)
        .with_timeouts(timeouts)
        .run(&devices, cancel)
        .await;

    summary.log_digest();
    Ok(summary)
}

/// Emit the JSON summary and return the run's exit status.
///
/// A summary that cannot be written to `output` goes to stdout instead; the
/// exit status still reflects the device outcomes.
fn publish(summary: &RunSummary, output: Option<&Path>) -> u8 {
    let json = match summary.to_json_pretty() {
        Ok(json) => json,
        Err(e) => {
            error!("Cannot render summary: {}", e);
            return summary.exit_code();
        }
    };

    match output {
        Some(path) => match std::fs::write(path, format!("{json}\n")) {
            Ok(()) => info!("Summary written to {}", path.display()),
            Err(e) => {
                error!("Cannot write summary to {}: {}", path.display(), e);
                println!("{json}");
            }
        },
        None => println!("{json}"),
    }
    summary.exit_code()
}
