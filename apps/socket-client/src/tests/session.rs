// Unit tests for the session runner
// Successful runs against a live gateway are covered in socket-core's integration tests

use crate::error::{ClientError, EXIT_OK, EXIT_STARTUP_FAILURE};
use crate::session::run_session;

use socket_core::config::{ClientConfig, FileConfig};
use socket_core::error::{LifecycleError, NegotiationError};

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    let file = FileConfig {
        negotiation_url: Some(format!("{}/api/apps.connections.open", server.uri())),
        ..FileConfig::default()
    };
    ClientConfig::from_sources(file, Some(String::from("tok-A"))).unwrap()
}

/// **VALUE**: Verifies that a refused token ends the run with a startup failure.
///
/// **WHY THIS MATTERS**: A wrong token type is the most common setup mistake. The user
/// needs exit code 1 and the gateway's reason.
///
/// **BUG THIS CATCHES**: Would catch a refusal that is swallowed and reported as success.
#[tokio::test]
async fn given_refused_token_when_session_runs_then_startup_failure() {
    // GIVEN: Gateway refusing the token
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "not_allowed_token_type"})),
        )
        .mount(&server)
        .await;
    let config = config_for(&server);

    // WHEN: Running a session
    let result = run_session(&config, CancellationToken::new()).await;

    // THEN: Rejected, exit 1
    match result {
        Err(err @ ClientError::Session(LifecycleError::Negotiation(
            NegotiationError::Rejected { .. },
        ))) => {
            assert_eq!(err.exit_code(), EXIT_STARTUP_FAILURE);
            assert!(err.to_string().contains("not_allowed_token_type"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a failing negotiation endpoint is a startup failure.
///
/// **BUG THIS CATCHES**: Would catch an HTTP 5xx that is retried or ignored.
#[tokio::test]
async fn given_server_error_when_session_runs_then_startup_failure() {
    // GIVEN: Gateway answering 500
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(&server);

    // WHEN: Running a session
    let result = run_session(&config, CancellationToken::new()).await;

    // THEN: Server error, exit 1, one request only
    match result {
        Err(err @ ClientError::Session(LifecycleError::Negotiation(
            NegotiationError::Server { status: 500, .. },
        ))) => assert_eq!(err.exit_code(), EXIT_STARTUP_FAILURE),
        other => panic!("expected Server, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a stop requested before the socket opens exits with 0.
///
/// **WHY THIS MATTERS**: A signal that lands during startup must end the process right
/// away, and it is a requested stop rather than a failure.
///
/// **BUG THIS CATCHES**: Would catch a run that ignores the token until streaming, or an
/// interrupt reported with a failure exit code.
#[tokio::test]
async fn given_shutdown_already_requested_when_session_runs_then_exits_cleanly() {
    // GIVEN: A slow gateway and a token that is already cancelled
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "url": "ws://127.0.0.1:9/link"}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let config = config_for(&server);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    // WHEN: Running a session
    let result = run_session(&config, shutdown).await;

    // THEN: Interrupted, exit 0
    match result {
        Err(err @ ClientError::Session(LifecycleError::Interrupted { .. })) => {
            assert_eq!(err.exit_code(), EXIT_OK);
        }
        other => panic!("expected Interrupted, got {other:?}"),
    }
}
