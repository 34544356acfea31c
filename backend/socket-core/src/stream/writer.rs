use crate::error::stream::StreamError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use futures_util::{Sink, SinkExt};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

const WRITER_QUEUE_DEPTH: usize = 32;

type Reply = oneshot::Sender<Result<(), StreamError>>;

enum WriterCommand {
    Text { payload: String, reply: Reply },
    Close { reply: Reply },
}

/// What the writer did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    pub frames_sent: u64,
    pub close_sent: bool,
}

/// Handle for queuing frames on the writer task.
///
/// Cloneable. Each call waits until the frame has been written (or refused),
/// so a single caller never has more than one send in flight.
#[derive(Clone)]
pub struct FrameSender {
    command_tx: mpsc::Sender<WriterCommand>,
}

impl FrameSender {
    /// Write one text frame.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Send`] if the socket write fails
    /// - [`StreamError::Closed`] if a close frame was already sent, an earlier
    ///   write failed, or the writer has stopped
    pub async fn send_text(&self, payload: String) -> Result<(), StreamError> {
        let (reply, done) = oneshot::channel();
        self.dispatch(WriterCommand::Text { payload, reply }, done)
            .await
    }

    /// Write a close frame (1000, empty reason). Only the first call writes.
    ///
    /// # Errors
    ///
    /// Same as [`FrameSender::send_text`]. Callers treat this as best-effort.
    pub async fn send_close(&self) -> Result<(), StreamError> {
        let (reply, done) = oneshot::channel();
        self.dispatch(WriterCommand::Close { reply }, done).await
    }

    #[track_caller]
    fn writer_gone() -> StreamError {
        StreamError::Closed {
            message: String::from("writer task has stopped"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    async fn dispatch(
        &self,
        command: WriterCommand,
        done: oneshot::Receiver<Result<(), StreamError>>,
    ) -> Result<(), StreamError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Self::writer_gone())?;

        done.await.map_err(|_| Self::writer_gone())?
    }
}

/// Owns the writer task. Dropping it detaches the task.
pub struct WriterHandle {
    task: JoinHandle<WriterReport>,
}

impl WriterHandle {
    /// Wait for the writer to drain and close the sink.
    ///
    /// The writer only finishes once every [`FrameSender`] clone is dropped.
    /// If that does not happen within `bound` the task is aborted, which drops
    /// the sink and with it the socket.
    pub async fn finish(mut self, bound: Duration) -> WriterReport {
        match timeout(bound, &mut self.task).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!("Writer task failed: {e}");
                WriterReport::default()
            }
            Err(_) => {
                warn!("Writer did not drain within {bound:?}, forcing the socket closed");
                self.task.abort();
                WriterReport::default()
            }
        }
    }
}

/// Start the writer task on `sink`.
pub fn spawn_writer<S>(sink: S) -> (FrameSender, WriterHandle)
where
    S: Sink<Message, Error = WsError> + Unpin + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(WRITER_QUEUE_DEPTH);
    let task = tokio::spawn(writer_actor(sink, command_rx));

    (FrameSender { command_tx }, WriterHandle { task })
}

/// The writer task.
///
/// Processes commands strictly in queue order until every sender is gone,
/// then closes the sink.
async fn writer_actor<S>(mut sink: S, mut command_rx: mpsc::Receiver<WriterCommand>) -> WriterReport
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let mut report = WriterReport::default();
    let mut broken = false;

    while let Some(command) = command_rx.recv().await {
        match command {
            WriterCommand::Text { payload, reply } => {
                let result = if report.close_sent {
                    Err(StreamError::Closed {
                        message: String::from("close frame already sent"),
                        location: ErrorLocation::from(Location::caller()),
                    })
                } else if broken {
                    Err(StreamError::Closed {
                        message: String::from("an earlier write failed"),
                        location: ErrorLocation::from(Location::caller()),
                    })
                } else {
                    match sink.send(Message::text(payload)).await {
                        Ok(()) => {
                            report.frames_sent += 1;
                            Ok(())
                        }
                        Err(e) => {
                            broken = true;
                            Err(StreamError::Send {
                                message: format!("write: {e}"),
                                location: ErrorLocation::from(Location::caller()),
                            })
                        }
                    }
                };

                if reply.send(result).is_err() {
                    debug!("Text frame caller went away before the reply");
                }
            }
            WriterCommand::Close { reply } => {
                let result = if report.close_sent {
                    debug!("Close frame already sent, not sending again");
                    Ok(())
                } else if broken {
                    Err(StreamError::Closed {
                        message: String::from("an earlier write failed"),
                        location: ErrorLocation::from(Location::caller()),
                    })
                } else {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: String::new().into(),
                    };
                    // No acks may follow the close frame, even if it failed.
                    report.close_sent = true;
                    match sink.send(Message::Close(Some(frame))).await {
                        Ok(()) => {
                            info!("Close frame sent");
                            Ok(())
                        }
                        Err(e) => {
                            broken = true;
                            Err(StreamError::Send {
                                message: format!("write close: {e}"),
                                location: ErrorLocation::from(Location::caller()),
                            })
                        }
                    }
                };

                if reply.send(result).is_err() {
                    debug!("Close frame caller went away before the reply");
                }
            }
        }
    }

    if let Err(e) = sink.close().await {
        debug!("Socket close after drain: {e}");
    }

    debug!(
        "Writer stopped: frames_sent={} close_sent={}",
        report.frames_sent, report.close_sent
    );
    report
}
