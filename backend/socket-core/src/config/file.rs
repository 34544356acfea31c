use crate::config::MalformedFramePolicy;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

/// On-disk shape of `config.toml`. Every key is optional.
///
/// ```toml
/// app_token = "xapp-1-..."
/// negotiation_url = "https://slack.com/api/apps.connections.open"
/// negotiation_timeout = "1s"
/// connect_timeout = "10s"
/// shutdown_timeout = "5s"
/// malformed_frames = "skip"
/// log_level = "info"
/// log_dir = "/var/log/socket-client"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub app_token: Option<String>,
    pub negotiation_url: Option<String>,
    pub negotiation_timeout: Option<String>,
    pub connect_timeout: Option<String>,
    pub shutdown_timeout: Option<String>,
    pub malformed_frames: Option<MalformedFramePolicy>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Read and parse a config file.
    ///
    /// A missing file yields the empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read, or
    /// [`ConfigError::ParseError`] if it is not valid TOML for this shape.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::parse(&contents).map_err(|reason| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason,
        })?;

        debug!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }
}
