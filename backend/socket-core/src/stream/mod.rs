//! Persistent WebSocket to the gateway.
//!
//! A [`StreamConnection`] is opened once per run and split into:
//!
//! - [`FrameReceiver`] - the read half, owned by the receive loop
//! - [`FrameSender`] - a cloneable handle onto the single writer task
//! - [`WriterHandle`] - joins the writer task and releases the socket
//!
//! # Writes
//!
//! Every outbound frame (acknowledgments and the close frame) goes through
//! one writer task that owns the sink. Sends are therefore serialized, and
//! once the close frame is out the writer refuses further text frames.

mod connection;
mod frame;
mod receiver;
mod writer;

pub use connection::{StreamConnection, WsStream};
pub use frame::InboundFrame;
pub use receiver::FrameReceiver;
pub use writer::{FrameSender, WriterHandle, WriterReport, spawn_writer};
