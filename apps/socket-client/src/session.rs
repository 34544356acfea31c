//! One client run: configuration, logging, signals, then the socket session.

use crate::error::ClientError;
use crate::logger::{DEFAULT_LOG_LEVEL, initialize as LoggerInitialize};

use socket_core::config::{ClientConfig, default_log_dir};
use socket_core::lifecycle::{LifecycleController, SessionSummary};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

/// Load configuration, start logging and run the session until it ends.
///
/// SIGINT and SIGTERM start a graceful shutdown.
///
/// # Errors
///
/// Returns [`ClientError`] if startup fails or the session does not end cleanly.
pub async fn run() -> Result<SessionSummary, ClientError> {
    let config = ClientConfig::load()?;

    let log_dir = resolve_log_dir(&config)?;
    create_dir_all(&log_dir).map_err(|e| ClientError::LogDirectory {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    LoggerInitialize(&log_dir, config.log_level.unwrap_or(DEFAULT_LOG_LEVEL))?;

    info!("Socket client starting");
    info!("Log directory: {}", log_dir.display());
    info!("Config: {}", config.summary());

    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(forward_shutdown_signal(shutdown.clone()));

    let result = run_session(&config, shutdown).await;
    signals.abort();

    result
}

/// Run one session with an externally owned shutdown token.
///
/// # Errors
///
/// Returns [`ClientError::Session`] for any lifecycle failure.
pub async fn run_session(
    config: &ClientConfig,
    shutdown: CancellationToken,
) -> Result<SessionSummary, ClientError> {
    let mut controller = LifecycleController::new(config)?;
    let summary = controller.run(&config.credential, shutdown).await?;

    info!(
        "Session summary: trigger={:?} frames_received={} acks_sent={} frames_skipped={} exit={:?}",
        summary.trigger,
        summary.receive_loop.frames_received,
        summary.receive_loop.acks_sent,
        summary.receive_loop.frames_skipped,
        summary.receive_loop.exit,
    );

    Ok(summary)
}

#[track_caller]
fn resolve_log_dir(config: &ClientConfig) -> Result<PathBuf, ClientError> {
    config
        .log_dir
        .clone()
        .or_else(default_log_dir)
        .ok_or_else(|| ClientError::LogDirectory {
            message: String::from("No log_dir configured and no platform data directory"),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// Cancel `shutdown` on the first SIGINT or SIGTERM.
async fn forward_shutdown_signal(shutdown: CancellationToken) {
    shutdown_signal().await;
    info!("Shutdown signal received");
    shutdown.cancel();
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = ctrl_c => {
                        if let Err(e) = result {
                            error!("Ctrl-C handler failed: {e}");
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler, using Ctrl-C only: {e}");
                if let Err(e) = ctrl_c.await {
                    error!("Ctrl-C handler failed: {e}");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            error!("Ctrl-C handler failed: {e}");
            std::future::pending::<()>().await;
        }
    }
}
