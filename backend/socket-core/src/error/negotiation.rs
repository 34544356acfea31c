use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum NegotiationError {
    #[error("HTTP Error: {message} {location}")]
    Http {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },

    #[error("Server Error: HTTP {status} - {message} {location}")]
    Server {
        status: u16,
        message: String,
        location: ErrorLocation,
    },

    #[error("Rejected Error: {reason} {location}")]
    Rejected {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Invalid Endpoint Error: {message} {location}")]
    InvalidEndpoint {
        message: String,
        location: ErrorLocation,
    },
}

impl From<url::ParseError> for NegotiationError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        NegotiationError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for NegotiationError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return NegotiationError::Timeout {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            };
        }

        NegotiationError::Http {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for NegotiationError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        NegotiationError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
