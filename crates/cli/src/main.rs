//! # musicd
//!
//! The multi-signer coordination sidecar: one process per DNSSEC signer,
//! coordinating zone-wide key and delegation state with its peers.

mod bootstrap;
mod di;
mod server;

use clap::Parser;
use music_application::ports::ZoneRepository;
use music_domain::CliOverrides;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "musicd")]
#[command(version)]
#[command(about = "Multi-signer DNSSEC coordination sidecar")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Management API port override
    #[arg(short = 'p', long)]
    api_port: Option<u16>,

    /// Database path override
    #[arg(long)]
    db: Option<String>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let overrides = CliOverrides {
        api_port: cli.api_port,
        db_path: cli.db.clone(),
        log_level: cli.log_level.clone(),
    };

    // One TLS crypto provider for the whole process; every rustls
    // config builder picks it up.
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Fatal on config or database errors, per the startup contract.
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);
    let pools = bootstrap::init_database(&config).await?;

    let shutdown = CancellationToken::new();
    let app = di::build(config, pools, shutdown.clone()).await?;

    // The engine consumes stimuli until shutdown.
    let engine = app.engine.clone();
    let engine_task = tokio::spawn(engine.run(app.engine_checks_rx, shutdown.clone()));

    // Resolve peers for every known zone once at startup; the tickers
    // keep the membership current afterwards.
    {
        let discovery = app.discovery.clone();
        let zones = app.state.zones.clone();
        tokio::spawn(async move {
            match zones.list_zones().await {
                Ok(zones) => {
                    for zone in zones {
                        if let Err(e) = discovery.reset_hsync_group(&zone.name).await {
                            error!(zone = %zone.name, error = %e, "Initial peer discovery failed");
                        }
                    }
                }
                Err(e) => error!(error = %e, "Cannot list zones for initial discovery"),
            }
        });
    }

    let management = tokio::spawn(server::serve_management(
        app.state.clone(),
        shutdown.clone(),
    ));
    let sync = tokio::spawn(server::serve_sync(app.state.clone(), shutdown.clone()));

    info!(identity = %app.state.config.sidecar.identity, "musicd running, press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
        _ = shutdown.cancelled() => {
            info!("Shutdown requested");
        }
    }
    shutdown.cancel();

    let _ = engine_task.await;
    if let Ok(Err(e)) = management.await {
        error!(error = %e, "Management server error");
    }
    if let Ok(Err(e)) = sync.await {
        error!(error = %e, "Sync server error");
    }

    info!("Clean shutdown");
    Ok(())
}
