use crate::ack::{AckProtocolHandler, ReceiveLoopReport, run_receive_loop};
use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, MalformedFramePolicy};
use crate::error::lifecycle::LifecycleError;
use crate::error::stream::StreamError;
use crate::lifecycle::state::LifecycleState;
use crate::negotiator::SessionNegotiator;
use crate::stream::{StreamConnection, WriterReport};

use common::{Credential, ErrorLocation};

use std::panic::Location;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;

/// What moved the session from Streaming to Closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The cancellation token fired.
    Interrupt,
    /// The receive loop ended on its own.
    ReceiveLoopEnded,
}

/// Result of a session that reached Terminated through Closing.
#[derive(Debug)]
pub struct SessionSummary {
    pub trigger: ShutdownTrigger,
    pub receive_loop: ReceiveLoopReport,
    pub writer: WriterReport,
}

/// Drives one session through the lifecycle.
pub struct LifecycleController {
    negotiator: SessionNegotiator,
    connect_timeout: Duration,
    shutdown_timeout: Duration,
    malformed_frames: MalformedFramePolicy,
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl LifecycleController {
    /// Build a controller from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Negotiation`] if the negotiation client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, LifecycleError> {
        let negotiator =
            SessionNegotiator::new(&config.negotiation_url, config.negotiation_timeout)?;

        Ok(Self::with_negotiator(
            negotiator,
            config.shutdown_timeout,
            config.malformed_frames,
        )
        .with_connect_timeout(config.connect_timeout))
    }

    pub fn with_negotiator(
        negotiator: SessionNegotiator,
        shutdown_timeout: Duration,
        malformed_frames: MalformedFramePolicy,
    ) -> Self {
        Self {
            negotiator,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            shutdown_timeout,
            malformed_frames,
            state: LifecycleState::Negotiating,
            history: vec![LifecycleState::Negotiating],
        }
    }

    /// Bound on the WebSocket handshake. Defaults to [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state entered so far, starting with Negotiating.
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    /// Run the session to completion.
    ///
    /// Returns once the session is Terminated. Cancelling `shutdown` before
    /// the socket is open ends the run at once. Cancelling it while streaming
    /// starts a graceful close: one close frame, then a wait for the receive
    /// loop. Writing the close frame and the wait share a single deadline of
    /// `shutdown_timeout`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Negotiation`] - negotiation failed, no socket was opened
    /// - [`LifecycleError::Connect`] - the socket could not be opened in time
    /// - [`LifecycleError::Interrupted`] - `shutdown` fired before streaming began
    /// - [`LifecycleError::ShutdownTimeout`] - the close did not finish by the deadline;
    ///   the receive loop and writer were aborted
    /// - [`LifecycleError::Join`] - the receive loop task panicked
    /// - [`LifecycleError::InvalidTransition`] - the controller was already run
    pub async fn run(
        &mut self,
        credential: &Credential,
        shutdown: CancellationToken,
    ) -> Result<SessionSummary, LifecycleError> {
        if self.state != LifecycleState::Negotiating {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: LifecycleState::Negotiating,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!("Negotiating socket session at {}", self.negotiator.endpoint());

        let negotiated = tokio::select! {
            result = self.negotiator.negotiate(credential) => {
                Some(result.and_then(|endpoint| endpoint.stream_url()))
            }
            _ = shutdown.cancelled() => None,
        };

        let url = match negotiated {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                error!("Negotiation failed: {e}");
                self.transition(LifecycleState::Terminated)?;
                return Err(LifecycleError::Negotiation(e));
            }
            None => return Err(self.interrupted()?),
        };

        self.transition(LifecycleState::Connecting)?;

        let connected = tokio::select! {
            result = timeout(self.connect_timeout, StreamConnection::connect(&url)) => Some(result),
            _ = shutdown.cancelled() => None,
        };

        let connection = match connected {
            Some(Ok(Ok(connection))) => connection,
            Some(Ok(Err(e))) => {
                error!("Connect failed: {e}");
                self.transition(LifecycleState::Terminated)?;
                return Err(LifecycleError::Connect(e));
            }
            Some(Err(_)) => {
                let e = StreamError::Connect {
                    message: format!(
                        "handshake did not complete within {:?}",
                        self.connect_timeout
                    ),
                    location: ErrorLocation::from(Location::caller()),
                };
                error!("Connect failed: {e}");
                self.transition(LifecycleState::Terminated)?;
                return Err(LifecycleError::Connect(e));
            }
            None => return Err(self.interrupted()?),
        };

        self.transition(LifecycleState::Streaming)?;

        let (receiver, sender, writer) = connection.into_parts();
        let handler = AckProtocolHandler::new(sender.clone());
        let mut receive_loop = tokio::spawn(run_receive_loop(
            receiver,
            handler,
            self.malformed_frames,
        ));

        let (trigger, finished) = tokio::select! {
            joined = &mut receive_loop => (ShutdownTrigger::ReceiveLoopEnded, Some(joined)),
            _ = shutdown.cancelled() => {
                info!("interrupt");
                (ShutdownTrigger::Interrupt, None)
            }
        };

        self.transition(LifecycleState::Closing)?;

        let deadline = Instant::now() + self.shutdown_timeout;
        let mut deadline_missed = false;

        match timeout_at(deadline, sender.send_close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => match trigger {
                ShutdownTrigger::Interrupt => warn!("write close: {e}"),
                ShutdownTrigger::ReceiveLoopEnded => info!("write close after loop end: {e}"),
            },
            Err(_) => {
                warn!(
                    "Close frame not written within {:?}, the writer is blocked",
                    self.shutdown_timeout
                );
                deadline_missed = true;
            }
        }
        drop(sender);

        let joined = match finished {
            Some(joined) => Some(joined),
            None => match timeout_at(deadline, &mut receive_loop).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    warn!(
                        "Receive loop still running {:?} after the close began, aborting it",
                        self.shutdown_timeout
                    );
                    receive_loop.abort();
                    if let Err(e) = receive_loop.await {
                        if !e.is_cancelled() {
                            error!("Receive loop failed while aborting: {e}");
                        }
                    }
                    None
                }
            },
        };

        // The aborted or finished loop has dropped its sender, so the writer can
        // drain. Whatever is left of the deadline bounds it; past the deadline it
        // is aborted straight away.
        let writer_report = writer
            .finish(deadline.saturating_duration_since(Instant::now()))
            .await;

        self.transition(LifecycleState::Terminated)?;

        let receive_loop = match joined {
            Some(Err(e)) => {
                error!("Receive loop task failed: {e}");
                return Err(LifecycleError::Join {
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Some(Ok(report)) if !deadline_missed => report,
            Some(Ok(_)) | None => {
                return Err(LifecycleError::ShutdownTimeout {
                    message: format!(
                        "close did not finish within {:?}; receive loop and writer aborted",
                        self.shutdown_timeout
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        info!(
            "Session terminated: trigger={trigger:?} frames_received={} acks_sent={} frames_written={}",
            receive_loop.frames_received, receive_loop.acks_sent, writer_report.frames_sent
        );

        Ok(SessionSummary {
            trigger,
            receive_loop,
            writer: writer_report,
        })
    }

    /// Move to Terminated after a cancel that arrived before streaming.
    #[track_caller]
    fn interrupted(&mut self) -> Result<LifecycleError, LifecycleError> {
        let stage = self.state;
        info!("Interrupted while {stage}, no socket to close");
        self.transition(LifecycleState::Terminated)?;

        Ok(LifecycleError::Interrupted {
            message: format!("shutdown requested while {stage}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    pub(crate) fn transition(&mut self, next: LifecycleState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: next,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!("Lifecycle: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}
