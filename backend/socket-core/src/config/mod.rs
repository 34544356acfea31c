//! Client configuration.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`$SOCKET_CLIENT_CONFIG`, else `{config_dir}/socket-client/config.toml`)
//! 3. Process environment, after `.env` has been loaded (`APP_TOKEN`)
//!
//! The credential has no default. A run without one fails before negotiation.

mod file;

pub use file::FileConfig;

use crate::DEFAULT_NEGOTIATION_URL;
use crate::error::config::ConfigError;

use common::{Credential, ErrorLocation};

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{LevelFilter, debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_TOKEN_ENV: &str = "APP_TOKEN";
pub const CONFIG_PATH_ENV: &str = "SOCKET_CLIENT_CONFIG";

const CONFIG_DIR_NAME: &str = "socket-client";
const CONFIG_FILE_NAME: &str = "config.toml";
const DOTENV_FILE_NAME: &str = ".env";

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What the receive loop does with a frame that is not a JSON object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedFramePolicy {
    /// Log and keep reading.
    #[default]
    Skip,
    /// End the session.
    Terminate,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: Credential,
    pub negotiation_url: String,
    pub negotiation_timeout: Duration,
    /// Bound on the WebSocket handshake.
    pub connect_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub malformed_frames: MalformedFramePolicy,
    pub log_level: Option<LevelFilter>,
    pub log_dir: Option<PathBuf>,
    /// Config file that was read, if one existed.
    pub config_file: Option<PathBuf>,
    /// `.env` file that was loaded, if any.
    pub dotenv_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from `.env`, the environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - The config file exists but cannot be read or parsed
    /// - `$SOCKET_CLIENT_CONFIG` names a file that does not exist
    /// - No credential is available from any source
    /// - A value fails validation
    pub fn load() -> Result<Self, ConfigError> {
        let dotenv_file = try_load_dotenv();
        let env_token = read_env_token()?;

        let mut config = match env::var_os(CONFIG_PATH_ENV) {
            Some(explicit) => {
                let path = PathBuf::from(explicit);
                if !path.exists() {
                    return Err(ConfigError::ReadError {
                        location: ErrorLocation::from(Location::caller()),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("{CONFIG_PATH_ENV} points at a missing file"),
                        ),
                        path,
                    });
                }
                Self::from_file(&path, env_token)?
            }
            None => match default_config_path() {
                Some(path) => Self::from_file(&path, env_token)?,
                None => {
                    debug!("No platform config directory, skipping config file");
                    Self::from_sources(FileConfig::default(), env_token)?
                }
            },
        };

        config.dotenv_file = dotenv_file;
        Ok(config)
    }

    /// Read the config file at `path` (missing means empty) and merge the
    /// environment token.
    ///
    /// # Errors
    ///
    /// Same as [`FileConfig::load`] and [`ClientConfig::from_sources`].
    pub fn from_file(path: &Path, env_token: Option<String>) -> Result<Self, ConfigError> {
        let file = FileConfig::load(path)?;
        let mut config = Self::from_sources(file, env_token)?;

        if path.exists() {
            config.config_file = Some(path.to_path_buf());
        }

        Ok(config)
    }

    /// Merge a parsed config file with the environment token.
    ///
    /// An environment token wins over `app_token` in the file.
    #[track_caller]
    pub fn from_sources(file: FileConfig, env_token: Option<String>) -> Result<Self, ConfigError> {
        let token = match (env_token, file.app_token) {
            (Some(token), _) => {
                debug!("Using credential from {APP_TOKEN_ENV}");
                token
            }
            (None, Some(token)) => {
                debug!("Using credential from config file");
                token
            }
            (None, None) => {
                return Err(ConfigError::MissingCredential {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!(
                        "Set {APP_TOKEN_ENV} in the environment or .env, or app_token in {CONFIG_FILE_NAME}"
                    ),
                });
            }
        };

        let credential = Credential::new(token)?;

        let negotiation_timeout = match file.negotiation_timeout {
            Some(raw) => parse_duration("negotiation_timeout", &raw)?,
            None => DEFAULT_NEGOTIATION_TIMEOUT,
        };

        let connect_timeout = match file.connect_timeout {
            Some(raw) => parse_duration("connect_timeout", &raw)?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        let shutdown_timeout = match file.shutdown_timeout {
            Some(raw) => parse_duration("shutdown_timeout", &raw)?,
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        let log_level = match file.log_level {
            Some(raw) => Some(raw.parse::<LevelFilter>().map_err(|e| {
                ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("Invalid log_level '{raw}': {e}"),
                }
            })?),
            None => None,
        };

        let config = Self {
            credential,
            negotiation_url: file
                .negotiation_url
                .unwrap_or_else(|| DEFAULT_NEGOTIATION_URL.to_string()),
            negotiation_timeout,
            connect_timeout,
            shutdown_timeout,
            malformed_frames: file.malformed_frames.unwrap_or_default(),
            log_level,
            log_dir: file.log_dir,
            config_file: None,
            dotenv_file: None,
        };

        config.validate()?;

        Ok(config)
    }

    /// One-line description of the resolved config, safe to log.
    ///
    /// Loading runs before the logger exists, so callers log this once
    /// logging is up.
    pub fn summary(&self) -> String {
        format!(
            "negotiation_url={}, negotiation_timeout={:?}, connect_timeout={:?}, shutdown_timeout={:?}, malformed_frames={:?}, token_kind={}, config_file={}, dotenv_file={}",
            self.negotiation_url,
            self.negotiation_timeout,
            self.connect_timeout,
            self.shutdown_timeout,
            self.malformed_frames,
            self.credential.kind().unwrap_or("unknown"),
            display_path(self.config_file.as_deref()),
            display_path(self.dotenv_file.as_deref()),
        )
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.negotiation_url).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid negotiation_url '{}': {e}", self.negotiation_url),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "negotiation_url must be http or https, got '{}'",
                    url.scheme()
                ),
            });
        }

        if self.negotiation_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "negotiation_timeout must be greater than zero".to_string(),
            });
        }

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "connect_timeout must be greater than zero".to_string(),
            });
        }

        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "shutdown_timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Default config file location, `{config_dir}/socket-client/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Default log directory, `{data_local_dir}/socket-client/logs`.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("logs"))
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| String::from("none"), |path| path.display().to_string())
}

#[track_caller]
fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: format!("Invalid {key} '{raw}': {e}"),
    })
}

#[track_caller]
fn read_env_token() -> Result<Option<String>, ConfigError> {
    match env::var(APP_TOKEN_ENV) {
        Ok(value) if value.trim().is_empty() => {
            warn!("{APP_TOKEN_ENV} is set but empty, ignoring it");
            Ok(None)
        }
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("{APP_TOKEN_ENV} contains invalid unicode"),
        }),
    }
}

/// Load `.env` from the working directory, then from next to the executable.
///
/// Returns the path that was loaded, if any. Variables already present in the
/// environment are not overwritten.
fn try_load_dotenv() -> Option<PathBuf> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from: {:?}", path);
        return Some(path);
    }

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))?;
    let env_path = exe_dir.join(DOTENV_FILE_NAME);

    if !env_path.exists() {
        debug!("No .env found");
        return None;
    }

    match dotenvy::from_path(&env_path) {
        Ok(()) => {
            debug!("Loaded .env from: {:?}", env_path);
            Some(env_path)
        }
        Err(e) => {
            warn!("Failed to parse .env at {:?}: {}", env_path, e);
            None
        }
    }
}
