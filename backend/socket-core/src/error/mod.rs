pub mod ack;
pub mod config;
pub mod lifecycle;
pub mod negotiation;
pub mod protocol;
pub mod stream;

pub use ack::AckError;
pub use config::ConfigError;
pub use lifecycle::LifecycleError;
pub use negotiation::NegotiationError;
pub use protocol::ProtocolError;
pub use stream::StreamError;
