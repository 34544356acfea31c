use crate::error::protocol::ProtocolError;
use crate::error::stream::StreamError;

use thiserror::Error as ThisError;

/// Failure while handling one inbound frame.
#[derive(Debug, ThisError)]
pub enum AckError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
