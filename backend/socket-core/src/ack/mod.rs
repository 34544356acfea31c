//! Envelope acknowledgment protocol.
//!
//! Every inbound frame that carries a non-empty `envelope_id` is answered with
//! exactly one `{"envelope_id": "<id>"}` text frame, in arrival order. Frames
//! without one are logged and otherwise ignored.

mod envelope;
mod handler;
mod receive_loop;

pub use envelope::{Acknowledgment, InboundEnvelope, acknowledgment_for, decode_frame};
pub use handler::{AckProtocolHandler, FrameDisposition};
pub use receive_loop::{LoopExit, ReceiveLoopReport, run_receive_loop};
