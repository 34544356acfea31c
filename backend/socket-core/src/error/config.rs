use std::path::PathBuf;

use common::{CredentialError, ErrorLocation};

use std::panic::Location;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {source} {location}")]
    ReadError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {reason} {location}")]
    ParseError {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Missing Credential Error: {reason} {location}")]
    MissingCredential {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Invalid Credential Error: {source} {location}")]
    InvalidCredential {
        location: ErrorLocation,
        #[source]
        source: CredentialError,
    },

    #[error("Config Validation Error: {reason} {location}")]
    ValidationError {
        location: ErrorLocation,
        reason: String,
    },
}

impl From<CredentialError> for ConfigError {
    #[track_caller]
    fn from(error: CredentialError) -> Self {
        ConfigError::InvalidCredential {
            location: ErrorLocation::from(Location::caller()),
            source: error,
        }
    }
}
