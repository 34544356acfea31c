use crate::helpers::{TEST_TOKEN, mock_negotiation, negotiation_url};

use socket_core::error::NegotiationError;
use socket_core::negotiator::SessionNegotiator;

use common::Credential;

use std::io::{Read, Write};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Public API tests for SessionNegotiator
// These run against a mock apps.connections.open endpoint
// ============================================================================

const TIMEOUT: Duration = Duration::from_secs(1);

fn credential() -> Credential {
    Credential::new(TEST_TOKEN).unwrap()
}

/// **VALUE**: Verifies the request shape and the decoded endpoint.
///
/// **WHY THIS MATTERS**: The gateway only accepts the app token as a bearer header with a
/// form content type. A JSON content type is rejected with `invalid_form_data`.
///
/// **BUG THIS CATCHES**: Would catch a changed method, a missing header, or a URL that
/// is altered on the way through.
#[tokio::test]
async fn given_valid_token_when_negotiate_then_returns_socket_url() {
    // GIVEN: Endpoint that only matches the expected request
    let server = mock_negotiation(json!({"ok": true, "url": "wss://example/session/1"})).await;
    let negotiator = SessionNegotiator::new(&negotiation_url(&server), TIMEOUT).unwrap();

    // WHEN: Negotiating as tok-A
    let endpoint = negotiator.negotiate(&credential()).await.unwrap();

    // THEN: The URL comes back verbatim
    assert!(endpoint.ok);
    assert_eq!(endpoint.url, "wss://example/session/1");
    assert_eq!(
        endpoint.stream_url().unwrap().as_str(),
        "wss://example/session/1"
    );
}

/// **VALUE**: Verifies that `ok: false` is surfaced as a rejection with the gateway's code.
///
/// **WHY THIS MATTERS**: This is what a revoked or wrong-type token looks like. The code
/// in the log tells the operator which.
///
/// **BUG THIS CATCHES**: Would catch if `ok` is ignored and a URL is handed to the dialer.
#[tokio::test]
async fn given_gateway_refusal_when_stream_url_requested_then_returns_rejected() {
    // GIVEN: A refusal body that still names a URL
    let server = mock_negotiation(json!({
        "ok": false,
        "error": "invalid_auth",
        "url": "wss://example/session/1",
    }))
    .await;
    let negotiator = SessionNegotiator::new(&negotiation_url(&server), TIMEOUT).unwrap();

    // WHEN: Negotiating, then asking for the socket URL
    let endpoint = negotiator.negotiate(&credential()).await.unwrap();
    let result = endpoint.stream_url();

    // THEN: Decoded as-is, rejected with the code
    assert!(!endpoint.ok);
    match result {
        Err(NegotiationError::Rejected { reason, .. }) => assert_eq!(reason, "invalid_auth"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

/// **VALUE**: Verifies that non-2xx statuses are reported with the status code.
///
/// **BUG THIS CATCHES**: Would catch if a 5xx error page is fed to the JSON decoder.
#[tokio::test]
async fn given_server_error_when_negotiate_then_returns_server_error() {
    // GIVEN: Endpoint answering 503
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;
    let negotiator = SessionNegotiator::new(&negotiation_url(&server), TIMEOUT).unwrap();

    // WHEN: Negotiating
    let result = negotiator.negotiate(&credential()).await;

    // THEN: Server error with status and body
    match result {
        Err(NegotiationError::Server {
            status, message, ..
        }) => {
            assert_eq!(status, 503);
            assert!(message.contains("upstream unavailable"));
        }
        other => panic!("expected Server, got {other:?}"),
    }
}

/// **VALUE**: Verifies that an error status with a truncated body still reports why.
///
/// **WHY THIS MATTERS**: Proxies in front of the gateway often cut the connection mid-body
/// on failure. The status alone is then all the operator gets, and the log must say the
/// body was lost rather than show an empty message.
///
/// **BUG THIS CATCHES**: Would catch a body read failure that is silently replaced by "".
#[tokio::test]
async fn given_error_status_with_truncated_body_when_negotiate_then_message_reports_read_failure()
{
    // GIVEN: A raw server that promises 100 bytes, sends 5, then hangs up
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 4096];
        stream.read(&mut request).ok();
        stream
            .write_all(
                b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort",
            )
            .ok();
    });
    let url = format!("http://127.0.0.1:{port}/api/apps.connections.open");
    let negotiator = SessionNegotiator::new(&url, TIMEOUT).unwrap();

    // WHEN: Negotiating
    let result = negotiator.negotiate(&credential()).await;
    server.join().unwrap();

    // THEN: Server error naming the lost body
    match result {
        Err(NegotiationError::Server {
            status, message, ..
        }) => {
            assert_eq!(status, 502);
            assert!(message.contains("unreadable"), "message was {message:?}");
        }
        other => panic!("expected Server, got {other:?}"),
    }
}

/// **VALUE**: Verifies that an undecodable body is a JSON error.
///
/// **BUG THIS CATCHES**: Would catch if a body missing `ok` decodes to a default endpoint.
#[tokio::test]
async fn given_garbage_body_when_negotiate_then_returns_json_error() {
    // GIVEN: Non-JSON and wrong-shape bodies
    for body in ["<html>maintenance</html>", r#"{"url":"wss://example"}"#] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        let negotiator = SessionNegotiator::new(&negotiation_url(&server), TIMEOUT).unwrap();

        // WHEN: Negotiating
        let result = negotiator.negotiate(&credential()).await;

        // THEN: JSON error
        assert!(
            matches!(result, Err(NegotiationError::Json { .. })),
            "body {body:?} gave {result:?}"
        );
    }
}

/// **VALUE**: Verifies that the request timeout is enforced.
///
/// **WHY THIS MATTERS**: Startup must not hang on a stalled gateway; the bound is short
/// because negotiation is a single small request.
///
/// **BUG THIS CATCHES**: Would catch if the timeout is not applied to the client.
#[tokio::test]
async fn given_slow_gateway_when_negotiate_then_returns_timeout() {
    // GIVEN: Endpoint slower than the timeout
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "url": "wss://example/session/1"}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    let negotiator =
        SessionNegotiator::new(&negotiation_url(&server), Duration::from_millis(100)).unwrap();

    // WHEN: Negotiating
    let result = negotiator.negotiate(&credential()).await;

    // THEN: Timeout
    assert!(
        matches!(result, Err(NegotiationError::Timeout { .. })),
        "got {result:?}"
    );
}

/// **VALUE**: Verifies that an unreachable gateway is an HTTP error, not a panic.
///
/// **BUG THIS CATCHES**: Would catch if transport errors are unwrapped.
#[tokio::test]
async fn given_unreachable_gateway_when_negotiate_then_returns_http_error() {
    // GIVEN: A port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = format!("http://127.0.0.1:{port}/api/apps.connections.open");
    let negotiator = SessionNegotiator::new(&url, TIMEOUT).unwrap();

    // WHEN: Negotiating
    let result = negotiator.negotiate(&credential()).await;

    // THEN: HTTP error
    assert!(
        matches!(result, Err(NegotiationError::Http { .. })),
        "got {result:?}"
    );
}

/// **VALUE**: Verifies that a bad endpoint is rejected at construction.
///
/// **BUG THIS CATCHES**: Would catch if URL parsing is deferred to the first request.
#[test]
fn given_bad_endpoint_when_negotiator_created_then_returns_url_parse_error() {
    let result = SessionNegotiator::new("not a url", TIMEOUT);

    assert!(matches!(result, Err(NegotiationError::UrlParse { .. })));
}
