// Unit tests for the lifecycle state machine
// Full runs against a live gateway are in integration_tests/lifecycle.rs

use crate::config::MalformedFramePolicy;
use crate::error::LifecycleError;
use crate::lifecycle::{LifecycleController, LifecycleState};
use crate::negotiator::SessionNegotiator;

use std::time::Duration;

use LifecycleState::*;

const ALL_STATES: [LifecycleState; 5] = [Negotiating, Connecting, Streaming, Closing, Terminated];

fn controller() -> LifecycleController {
    let negotiator =
        SessionNegotiator::new("http://127.0.0.1:9/api/apps.connections.open", Duration::from_secs(1))
            .unwrap();
    LifecycleController::with_negotiator(
        negotiator,
        Duration::from_secs(1),
        MalformedFramePolicy::Skip,
    )
}

/// **VALUE**: Verifies the exact edge set of the lifecycle.
///
/// **WHY THIS MATTERS**: The controller relies on this table to refuse out-of-order
/// transitions, e.g. reopening a socket after Closing.
///
/// **BUG THIS CATCHES**: Would catch an accidental reconnect edge (Closing -> Connecting)
/// or a missing abort edge (Connecting -> Terminated).
#[test]
fn given_all_state_pairs_when_checked_then_only_lifecycle_edges_allowed() {
    let allowed = [
        (Negotiating, Connecting),
        (Negotiating, Terminated),
        (Connecting, Streaming),
        (Connecting, Terminated),
        (Streaming, Closing),
        (Closing, Terminated),
    ];

    for from in ALL_STATES {
        for to in ALL_STATES {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

/// **VALUE**: Verifies Terminated is the only terminal state and has no way out.
///
/// **WHY THIS MATTERS**: No restart within one invocation.
///
/// **BUG THIS CATCHES**: Would catch if Terminated gains an outgoing edge.
#[test]
fn given_terminated_when_checked_then_is_terminal_with_no_exits() {
    assert!(Terminated.is_terminal());
    assert!(ALL_STATES.iter().all(|s| !Terminated.can_transition_to(*s)));
    assert!(ALL_STATES[..4].iter().all(|s| !s.is_terminal()));
}

/// **VALUE**: Verifies that the controller starts in Negotiating and records transitions.
///
/// **WHY THIS MATTERS**: The history is what integration tests and logs use to show
/// which path a run took.
///
/// **BUG THIS CATCHES**: Would catch if history stops recording or the initial state changes.
#[test]
fn given_new_controller_when_transitioned_then_history_records_path() {
    // GIVEN: A fresh controller
    let mut controller = controller();
    assert_eq!(controller.state(), Negotiating);

    // WHEN: Walking the happy path
    for next in [Connecting, Streaming, Closing, Terminated] {
        controller.transition(next).unwrap();
    }

    // THEN: Every state recorded in order
    assert_eq!(controller.history(), &ALL_STATES);
}

/// **VALUE**: Verifies that illegal transitions are rejected without changing state.
///
/// **BUG THIS CATCHES**: Would catch if the check is skipped or state changes before it.
#[test]
fn given_negotiating_when_jumping_to_streaming_then_returns_invalid_transition() {
    // GIVEN: A fresh controller
    let mut controller = controller();

    // WHEN: Skipping Connecting
    let result = controller.transition(Streaming);

    // THEN: Rejected, state unchanged
    assert!(matches!(
        result,
        Err(LifecycleError::InvalidTransition {
            from: Negotiating,
            to: Streaming,
            ..
        })
    ));
    assert_eq!(controller.state(), Negotiating);
    assert_eq!(controller.history(), &[Negotiating]);
}
