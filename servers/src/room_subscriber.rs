//! Keeps a live-stream control plane subscribed to every room in the VTuber directory and
//! holds the event stream open.

use anyhow::{Context, Result};
use tokio::signal;

use lib_common::configs::load_config;
use lib_common::core::Orchestrator;
use lib_common::loggers::setup_logging;

const APP_NAME: &str = "room_subscriber";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    let settings = load_config().context("invalid configuration")?;
    setup_logging(APP_NAME, settings.log_dir.as_deref(), &settings.log_level)?;
    log::info!("{}", settings);

    let orchestrator = Orchestrator::from_settings(&settings)?;

    tokio::select! {
        result = orchestrator.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, shutting down.");
        }
        _ = terminate() => {
            log::info!("SIGTERM received, shutting down.");
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut term_signal) => {
            term_signal.recv().await;
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-unix platforms, just wait forever.
    std::future::pending::<()>().await;
}
