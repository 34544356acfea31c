use std::fmt::{Display, Formatter, Result as FormatResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Negotiating,
    Connecting,
    Streaming,
    Closing,
    Terminated,
}

impl LifecycleState {
    /// Whether `self -> next` is an edge of the lifecycle.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Negotiating, Connecting)
                | (Negotiating, Terminated)
                | (Connecting, Streaming)
                | (Connecting, Terminated)
                | (Streaming, Closing)
                | (Closing, Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Terminated
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Negotiating
    }
}

impl Display for LifecycleState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            LifecycleState::Negotiating => "Negotiating",
            LifecycleState::Connecting => "Connecting",
            LifecycleState::Streaming => "Streaming",
            LifecycleState::Closing => "Closing",
            LifecycleState::Terminated => "Terminated",
        };
        write!(formatter, "{name}")
    }
}
