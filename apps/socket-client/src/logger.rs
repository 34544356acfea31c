//! Logging for the socket client.
//!
//! Dual output (stdout with colors + file) with thread-safe initialization.

use crate::error::ClientError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Set once a logger has actually been installed.
static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Log file name.
pub const LOG_FILE_NAME: &str = "socket-client.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Default log level for debug builds.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Default log level for release builds.
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Transport crates are chatty at debug. Cap them regardless of the client level.
const QUIET_TARGETS: [&str; 4] = ["tungstenite", "tokio_tungstenite", "rustls", "hyper_util"];

/// Initialize the logger with dual output (stdout + file).
///
/// Safe to call multiple times. Later calls log a warning and return Ok.
///
/// # Arguments
///
/// * `log_dir` - Directory where the log file will be created
/// * `level` - Maximum level for client records
///
/// # Errors
///
/// Returns [`ClientError::Logger`] if the log file cannot be created or the
/// global logger is already taken.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), ClientError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir, level).and_then(apply);
        if result.is_ok() {
            LOGGER_INSTALLED.store(true, Ordering::SeqCst);
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

/// Whether a logger is installed. Before that, log records go nowhere.
pub fn is_installed() -> bool {
    LOGGER_INSTALLED.load(Ordering::SeqCst)
}

/// Build the stdout + file dispatch without installing it.
#[track_caller]
pub(crate) fn build_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch, ClientError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let mut base_dispatch = Dispatch::new().level(level);
    for target in QUIET_TARGETS {
        base_dispatch = base_dispatch.level_for(target, level.min(LevelFilter::Info));
    }

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stdout());

    // Plain text, no colors
    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| ClientError::Logger {
                message: format!(
                    "Failed to create log file {}: {e}",
                    log_file_path.display()
                ),
                location: ErrorLocation::from(Location::caller()),
            })?,
        );

    Ok(base_dispatch.chain(stdout_dispatch).chain(file_dispatch))
}

#[track_caller]
fn apply(dispatch: Dispatch) -> Result<(), ClientError> {
    dispatch.apply().map_err(|e| ClientError::Logger {
        message: format!("Failed to initialize logger: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}
