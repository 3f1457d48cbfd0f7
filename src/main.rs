//! ots-anchor-worker - OpenTimestamps anchoring jobs with email notifications

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ots_anchor_worker::anchoring::ots::OpenTimestampsClient;
use ots_anchor_worker::notify::Notifier;
use ots_anchor_worker::storage::RestStore;
use ots_anchor_worker::{AnchorWorker, RunConfig, RunMode, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "ots-anchor-worker")]
#[command(about = "Process Bitcoin anchoring jobs with email notifications")]
struct Args {
    /// Maximum anchors to process per phase
    #[arg(long, default_value = "5")]
    limit: usize,

    /// Calendar timeout in seconds
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Operation mode: stamp (create proofs), followup (notify), both
    #[arg(long, value_enum, default_value = "both")]
    mode: RunMode,

    /// Only notify once the proof's Bitcoin attestation matches its block
    #[arg(long)]
    require_confirmation: bool,

    /// Pause between the stamp and follow-up phases, in seconds
    /// (only in `both` mode; `followup` starts immediately)
    #[arg(long, default_value = "2")]
    phase_pause_secs: u64,

    /// Log level
    #[arg(long, env = "OTS_WORKER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ots-anchor-worker v{}", env!("CARGO_PKG_VERSION"));

    // Credentials first: nothing runs without the store
    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Missing store configuration");
            return Err(e.into());
        }
    };

    let config = config
        .with_calendar_timeout(args.timeout)
        .with_run(RunConfig {
            limit: args.limit,
            mode: args.mode,
            phase_pause: Duration::from_secs(args.phase_pause_secs),
            require_confirmation: args.require_confirmation,
        });

    if !config.email.is_enabled() {
        tracing::warn!("RESEND_API_KEY not set, completion emails are disabled");
    }

    tracing::info!(
        mode = ?config.run.mode,
        limit = config.run.limit,
        calendars = config.ots.calendar_urls.len(),
        explorers = config.ots.explorer_urls.len(),
        timeout_secs = config.ots.timeout_secs,
        require_confirmation = config.run.require_confirmation,
        "Worker configured"
    );

    let store = Arc::new(RestStore::new(&config.store)?);
    let stamper = Arc::new(OpenTimestampsClient::with_config(config.ots.clone())?);
    let notifier = Notifier::from_config(&config.email, store.clone())?;

    let worker = AnchorWorker::new(store, stamper, notifier, config.run.clone());
    worker.run().await;

    Ok(())
}
