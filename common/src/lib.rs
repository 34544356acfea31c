//! Shared building blocks for the socket client.
//!
//! This crate holds the small, dependency-light types that both the core
//! library and the binary need:
//!
//! - [`ErrorLocation`]: call-site capture attached to every error variant
//! - [`Credential`]: the app-level bearer token, redacted in all output
//!
//! ## Architecture
//!
//! - **common** (this crate): Shared value types
//! - **socket-core**: Negotiation, stream, acknowledgment and lifecycle logic
//! - **socket-client**: Process wiring (config, logging, signals, exit codes)

pub mod credential;
pub mod error;

pub use credential::Credential;
pub use error::credential_error::CredentialError;
pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
