//! Run orchestration: negotiate, connect, stream, close.
//!
//! ```text
//! Negotiating -> Connecting -> Streaming -> Closing -> Terminated
//!      |              |
//!      +--------------+------------------------------> Terminated
//! ```
//!
//! One session per run. Nothing is retried and the socket is never reopened.

mod controller;
mod state;

pub use controller::{LifecycleController, SessionSummary, ShutdownTrigger};
pub use state::LifecycleState;
