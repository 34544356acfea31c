// Unit tests for logger module initialization logic
// Tests focus on thread-safety and error handling

use crate::error::ClientError;
use crate::logger::{LOG_FILE_NAME, build_dispatch, initialize, is_installed};

use std::path::PathBuf;

use log::LevelFilter;

/// **VALUE**: Verifies that the dispatch creates the log file in the given directory.
///
/// **BUG THIS CATCHES**: Would catch a changed file name or a file opened relative to
/// the working directory.
#[test]
fn given_writable_dir_when_dispatch_built_then_log_file_created() {
    // GIVEN: An empty directory
    let temp_dir = tempfile::tempdir().unwrap();

    // WHEN: Building the dispatch
    let result = build_dispatch(temp_dir.path(), LevelFilter::Info);

    // THEN: Built, with the file in place
    assert!(result.is_ok());
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that logger handles unusable directories gracefully.
///
/// **WHY THIS MATTERS**: A bad `log_dir` in the config must end the run with a clear
/// error and exit code 1, not a panic.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` is unwrapped.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_returns_logger_error() {
    // GIVEN: A path under a character device
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir, LevelFilter::Info);

    // THEN: Logger error
    assert!(matches!(result, Err(ClientError::Logger { .. })));
}

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: fern panics when a second global logger is installed. Tests
/// and the binary may both reach this path.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = tempfile::tempdir().unwrap();

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path(), LevelFilter::Debug);
    let result2 = initialize(temp_dir.path(), LevelFilter::Debug);

    // THEN: Both return Ok and a logger is in place
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
    assert!(is_installed());
}
