use crate::error::negotiation::NegotiationError;
use crate::error::stream::StreamError;
use crate::lifecycle::LifecycleState;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LifecycleError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Connect(StreamError),

    #[error("Interrupted Error: {message} {location}")]
    Interrupted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Shutdown Timeout Error: {message} {location}")]
    ShutdownTimeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Transition Error: {from} -> {to} {location}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
        location: ErrorLocation,
    },

    #[error("Join Error: {message} {location}")]
    Join {
        message: String,
        location: ErrorLocation,
    },
}
