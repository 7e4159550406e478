//! Lifecycle of a single conductor run.

use serde::{Deserialize, Serialize};

/// Phase of one `run_once` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Nothing has happened yet.
    Idle,
    /// Resolving the prompt and session, building the command.
    Building,
    /// The engine process is executing.
    Running,
    /// A result was produced.
    Done,
    /// The run ended with an error and no result.
    Failed,
}

impl RunPhase {
    /// Check whether moving to `next` is a legal transition.
    ///
    /// A build failure jumps straight from `Building` to `Failed`; `Done`
    /// and `Failed` are terminal.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Building)
                | (Self::Building, Self::Running | Self::Failed)
                | (Self::Running, Self::Done | Self::Failed)
        )
    }

    /// Whether the phase is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
