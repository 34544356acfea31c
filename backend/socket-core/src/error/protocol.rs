use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Malformed Frame Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not An Object Error: {message} {location}")]
    NotAnObject {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::Malformed {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
