//! icrdk - iControl LX deployment tool
//!
//! Usage:
//!   icrdk deploy [PATH]      # Upload and install a package (latest build/ file by default)
//!   icrdk query              # List installed packages
//!   icrdk uninstall NAME     # Remove an installed package

mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use icrdk_core::artifact::resolve_artifact;
use icrdk_core::config::{DEFAULT_CHUNK_SIZE, DeploySettings, ProfileLoader};
use icrdk_core::deploy::Deployer;
use icrdk_core::progress::ChannelProgress;
use icrdk_core::transport::{ReqwestTransport, TransportOptions};

use crate::report::Report;

#[derive(Parser)]
#[command(name = "icrdk")]
#[command(about = "Deploy iControl LX packages to a management appliance", long_about = None)]
struct Cli {
    /// Connection profile to use instead of devconfig.json discovery
    #[arg(long, global = true, env = "ICRDK_CONFIG")]
    config: Option<PathBuf>,

    /// Upload chunk size in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: u64,

    /// Seconds between task status polls
    #[arg(long, global = true, default_value_t = 2)]
    poll_interval: u64,

    /// Give up on a remote task after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Verify the appliance TLS certificate (self-signed certificates are accepted otherwise)
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a package and install it
    #[command(alias = "install")]
    Deploy {
        /// Package file; defaults to the newest file in ./build
        path: Option<PathBuf>,
    },

    /// List packages installed on the appliance
    Query,

    /// Uninstall a package by its full package name
    #[command(alias = "rm")]
    Uninstall {
        /// Package name as reported by `icrdk query`
        name: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub(crate) enum OutputFormat {
    /// Human-readable output
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "icrdk=debug,info" } else { "icrdk=info,warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;
    let report = run(cli).await?;
    report::print(&report, format)?;

    report.into_result()
}

async fn run(cli: Cli) -> Result<Report> {
    let settings = settings_from(&cli);

    let mut loader = ProfileLoader::with_defaults()?;
    if let Some(path) = &cli.config {
        loader = loader.with_explicit(path);
    }
    let profile = loader.load()?;

    let transport = ReqwestTransport::new(&profile, &TransportOptions::from_settings(&settings))
        .with_context(|| format!("Failed to set up a client for {}", profile.host()))?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let (progress, events) = ChannelProgress::new();
    let printer = report::spawn_progress_printer(events);

    let result = {
        let deployer = Deployer::new(transport, settings)?
            .with_progress(progress)
            .with_cancellation(cancel);

        match cli.command {
            Commands::Deploy { path } => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                let artifact = resolve_artifact(path.as_deref(), &cwd)
                    .context("No package to deploy, is the package built?")?;
                deployer
                    .install(&artifact)
                    .await
                    .map(Report::Installed)
                    .with_context(|| format!("Failed to deploy {}", artifact.display()))
            }
            Commands::Query => deployer
                .query()
                .await
                .map(Report::Packages)
                .with_context(|| format!("Failed to query packages on {}", profile.host())),
            Commands::Uninstall { name } => {
                let name = name.unwrap_or_default();
                deployer
                    .uninstall(&name)
                    .await
                    .map(Report::Uninstalled)
                    .with_context(|| format!("Failed to uninstall '{name}'"))
            }
        }
    };

    // The deployer owned the only sender, so the printer drains and exits.
    let _ = printer.await;
    result
}

fn settings_from(cli: &Cli) -> DeploySettings {
    let mut settings = DeploySettings::default()
        .with_chunk_size(cli.chunk_size)
        .with_poll_interval(Duration::from_secs(cli.poll_interval))
        .with_accept_invalid_certs(!cli.verify_tls);
    if let Some(timeout) = cli.timeout {
        settings = settings.with_poll_deadline(Duration::from_secs(timeout));
    }
    settings
}
