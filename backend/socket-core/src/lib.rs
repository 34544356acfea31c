pub mod ack;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod negotiator;
pub mod stream;

#[cfg(test)]
mod tests;

pub const SLACK_API_HOST: &str = "slack.com";
pub const SLACK_API_BASE_URL: &str = const_format::concatcp!("https://", SLACK_API_HOST, "/api/");
pub const CONNECTIONS_OPEN_METHOD: &str = "apps.connections.open";
pub const DEFAULT_NEGOTIATION_URL: &str =
    const_format::concatcp!(SLACK_API_BASE_URL, CONNECTIONS_OPEN_METHOD);
