use crate::ack::envelope::{acknowledgment_for, decode_frame};
use crate::error::ack::AckError;
use crate::stream::{FrameSender, InboundFrame};

use log::{debug, info, warn};

const DISCONNECT_KIND: &str = "disconnect";

/// Outcome of handling one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDisposition {
    /// An acknowledgment for this envelope id was written.
    Acknowledged(String),
    /// No envelope id; nothing was sent.
    Observed { kind: Option<String> },
}

/// Decodes frames and writes their acknowledgments.
pub struct AckProtocolHandler {
    sender: FrameSender,
}

impl AckProtocolHandler {
    pub fn new(sender: FrameSender) -> Self {
        Self { sender }
    }

    /// Handle one frame, sending at most one acknowledgment.
    ///
    /// Returns after the acknowledgment has been written, so calling this in
    /// a loop keeps acks in frame order.
    ///
    /// # Errors
    ///
    /// - [`AckError::Protocol`] if the frame does not decode
    /// - [`AckError::Stream`] if the acknowledgment could not be written
    pub async fn handle(&self, frame: &InboundFrame) -> Result<FrameDisposition, AckError> {
        debug!("recv: {}", frame.as_text_lossy());

        let envelope = decode_frame(frame)?;

        if envelope.kind.as_deref() == Some(DISCONNECT_KIND) {
            warn!("Gateway announced a disconnect; this client does not reconnect");
        }

        let Some(ack) = acknowledgment_for(&envelope) else {
            debug!(
                "No envelope_id on frame of type {}",
                envelope.kind.as_deref().unwrap_or("unknown")
            );
            return Ok(FrameDisposition::Observed {
                kind: envelope.kind,
            });
        };

        let payload = ack.to_frame()?;
        self.sender.send_text(payload).await?;

        info!("Acknowledged envelope_id: {}", ack.envelope_id());
        Ok(FrameDisposition::Acknowledged(ack.envelope_id().to_string()))
    }
}
