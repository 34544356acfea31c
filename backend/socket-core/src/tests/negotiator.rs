// Unit tests for negotiation response handling
// HTTP behavior is covered against a mock server in integration_tests/negotiator.rs

use crate::error::NegotiationError;
use crate::negotiator::{SessionEndpoint, redact_ticket};

fn endpoint(ok: bool, url: &str, error: Option<&str>) -> SessionEndpoint {
    SessionEndpoint {
        ok,
        url: url.to_string(),
        error: error.map(str::to_string),
    }
}

/// **VALUE**: Verifies that a well-formed endpoint yields its socket URL.
///
/// **BUG THIS CATCHES**: Would catch if the URL is altered during parsing.
#[test]
fn given_ok_endpoint_when_stream_url_requested_then_returns_url() {
    let url = endpoint(true, "wss://example/session/1", None)
        .stream_url()
        .unwrap();

    assert_eq!(url.as_str(), "wss://example/session/1");
}

/// **VALUE**: Verifies that `ok: false` is never dialed.
///
/// **WHY THIS MATTERS**: Dialing an empty or stale URL after a refusal just turns a clear
/// `invalid_auth` into a confusing connect error.
///
/// **BUG THIS CATCHES**: Would catch if the `ok` flag is ignored.
#[test]
fn given_rejected_endpoint_when_stream_url_requested_then_returns_rejected_with_reason() {
    let result = endpoint(false, "", Some("invalid_auth")).stream_url();

    match result {
        Err(NegotiationError::Rejected { reason, .. }) => assert_eq!(reason, "invalid_auth"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

/// **VALUE**: Verifies that missing and non-WebSocket URLs are refused.
///
/// **BUG THIS CATCHES**: Would catch if an https URL is handed to the WebSocket dialer.
#[test]
fn given_bad_urls_when_stream_url_requested_then_returns_invalid_endpoint() {
    for url in ["", "https://example/session/1", "::not a url::"] {
        let result = endpoint(true, url, None).stream_url();
        assert!(
            matches!(result, Err(NegotiationError::InvalidEndpoint { .. })),
            "url {url:?} should be rejected"
        );
    }
}

/// **VALUE**: Verifies that the ticket query string is removed from logged URLs.
///
/// **WHY THIS MATTERS**: The ticket grants a socket session. Log files are not secret.
///
/// **BUG THIS CATCHES**: Would catch if the full negotiated URL is logged.
#[test]
fn given_url_with_ticket_when_redacted_then_query_hidden() {
    let redacted = redact_ticket("wss://wss-primary.slack.com/link/?ticket=abc123&app_id=A1");

    assert!(!redacted.contains("abc123"));
    assert!(redacted.starts_with("wss://wss-primary.slack.com/link/"));
    assert_eq!(
        redact_ticket("wss://example/session/1"),
        "wss://example/session/1"
    );
}
