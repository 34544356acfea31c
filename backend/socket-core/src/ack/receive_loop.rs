use crate::ack::handler::{AckProtocolHandler, FrameDisposition};
use crate::config::MalformedFramePolicy;
use crate::error::ack::AckError;
use crate::error::protocol::ProtocolError;
use crate::error::stream::StreamError;
use crate::stream::FrameReceiver;

use futures_util::Stream;
use log::{error, info, warn};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Why the receive loop stopped.
#[derive(Debug)]
pub enum LoopExit {
    /// Peer sent a close frame or the stream ended.
    PeerClosed,
    /// A read failed.
    Transport(StreamError),
    /// An acknowledgment could not be written.
    Send(StreamError),
    /// A frame did not decode and the policy is `terminate`.
    Protocol(ProtocolError),
}

#[derive(Debug)]
pub struct ReceiveLoopReport {
    pub frames_received: u64,
    pub acks_sent: u64,
    pub frames_skipped: u64,
    pub exit: LoopExit,
}

/// Consume frames until the socket ends.
///
/// Frames are handled one at a time: the next read starts only after the
/// previous frame's acknowledgment has been written.
pub async fn run_receive_loop<S>(
    mut receiver: FrameReceiver<S>,
    handler: AckProtocolHandler,
    malformed_frames: MalformedFramePolicy,
) -> ReceiveLoopReport
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut frames_received = 0;
    let mut acks_sent = 0;
    let mut frames_skipped = 0;

    let exit = loop {
        let frame = match receiver.receive().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break LoopExit::PeerClosed,
            Err(e) => {
                warn!("{e}");
                break LoopExit::Transport(e);
            }
        };

        frames_received += 1;

        match handler.handle(&frame).await {
            Ok(FrameDisposition::Acknowledged(_)) => acks_sent += 1,
            Ok(FrameDisposition::Observed { .. }) => {}
            Err(AckError::Protocol(e)) => match malformed_frames {
                MalformedFramePolicy::Skip => {
                    warn!("Skipping undecodable frame: {e}");
                    frames_skipped += 1;
                }
                MalformedFramePolicy::Terminate => {
                    error!("Undecodable frame, ending session: {e}");
                    break LoopExit::Protocol(e);
                }
            },
            Err(AckError::Stream(e @ StreamError::Closed { .. })) => {
                info!("Acknowledgment not sent, socket is closing: {e}");
                break LoopExit::Send(e);
            }
            Err(AckError::Stream(e)) => {
                error!("{e}");
                break LoopExit::Send(e);
            }
        }
    };

    info!(
        "Receive loop finished: frames_received={frames_received} acks_sent={acks_sent} frames_skipped={frames_skipped} exit={exit:?}"
    );

    ReceiveLoopReport {
        frames_received,
        acks_sent,
        frames_skipped,
        exit,
    }
}
