//! Session negotiation.
//!
//! Exchanges the app-level credential for a single-use WebSocket URL via
//! `apps.connections.open`. One request per run, no retry.

use crate::error::negotiation::NegotiationError;

use common::{Credential, ErrorLocation};

use std::panic::Location;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const WEBSOCKET_SCHEMES: [&str; 2] = ["ws", "wss"];

/// Decoded body of the negotiation response.
///
/// `url` is only meaningful when `ok` is true. On failure the gateway
/// reports a short code in `error` (`invalid_auth`, `not_allowed_token_type`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionEndpoint {
    pub ok: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl SessionEndpoint {
    /// The socket URL to dial.
    ///
    /// # Errors
    ///
    /// - [`NegotiationError::Rejected`] if `ok` is false
    /// - [`NegotiationError::InvalidEndpoint`] if the URL is missing, unparsable or not `ws(s)`
    #[track_caller]
    pub fn stream_url(&self) -> Result<Url, NegotiationError> {
        if !self.ok {
            let reason = self.error.as_deref().unwrap_or("unspecified");
            warn!("Gateway refused socket session: {reason}");
            return Err(NegotiationError::Rejected {
                reason: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.url.is_empty() {
            return Err(NegotiationError::InvalidEndpoint {
                message: String::from("gateway returned ok=true without a url"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let url = Url::parse(&self.url).map_err(|e| NegotiationError::InvalidEndpoint {
            message: format!("unparsable socket url: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !WEBSOCKET_SCHEMES.contains(&url.scheme()) {
            return Err(NegotiationError::InvalidEndpoint {
                message: format!("expected ws or wss url, got scheme '{}'", url.scheme()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(url)
    }
}

#[derive(Clone)]
pub struct SessionNegotiator {
    endpoint: Url,
    client: Client,
}

impl SessionNegotiator {
    /// Build a negotiator for `endpoint_str` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::UrlParse`] for a bad endpoint, or
    /// [`NegotiationError::Http`] if the HTTP client cannot be constructed.
    pub fn new(endpoint_str: &str, timeout: Duration) -> Result<Self, NegotiationError> {
        let endpoint = Url::parse(endpoint_str)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request a socket session.
    ///
    /// Sends `POST` with `Authorization: Bearer <token>` and a form content
    /// type, no body.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError`] if the request fails or times out, the
    /// status is not 2xx, or the body does not decode. An `ok: false` answer
    /// is returned as-is; [`SessionEndpoint::stream_url`] rejects it.
    pub async fn negotiate(
        &self,
        credential: &Credential,
    ) -> Result<SessionEndpoint, NegotiationError> {
        debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("response body unreadable: {e}"),
            };
            return Err(NegotiationError::Server {
                status: status.as_u16(),
                message,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let body = response.text().await?;
        let endpoint: SessionEndpoint = serde_json::from_str(&body)?;

        info!(
            "Negotiation response: ok={} url={}",
            endpoint.ok,
            redact_ticket(&endpoint.url)
        );

        Ok(endpoint)
    }
}

/// Socket URLs carry a one-time ticket in the query string. Keep it out of logs.
pub(crate) fn redact_ticket(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.query().is_some() {
                url.set_query(Some("[REDACTED]"));
            }
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}
