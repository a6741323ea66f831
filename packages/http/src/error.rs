use std::time::Duration;

use arm_lro_core::PollingState;

/// Why a poll loop stopped without reaching a terminal status.
///
/// Every variant raised mid-operation carries the last known-good state, so
/// callers can persist progress before deciding what to do.
#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Lro(#[from] arm_lro_core::Error),

    /// The request never produced a response. `state` is `None` only when
    /// the initiating request itself failed.
    #[error("Transport error requesting {url}: {message}")]
    Transport {
        url: String,
        message: String,
        state: Option<Box<PollingState>>,
    },

    /// The caller's poll budget ran out. Not an operation failure.
    #[error("Operation still {} after {polls} polls", .state.status)]
    Exhausted { polls: u32, state: Box<PollingState> },

    /// The caller's deadline passed. Not an operation failure.
    #[error("Operation still {} after {elapsed:?}", .state.status)]
    DeadlineExceeded {
        elapsed: Duration,
        state: Box<PollingState>,
    },
}

impl PollError {
    pub fn last_state(&self) -> Option<&PollingState> {
        match self {
            PollError::Lro(e) => e.last_state(),
            PollError::Transport { state, .. } => state.as_deref(),
            PollError::Exhausted { state, .. } | PollError::DeadlineExceeded { state, .. } => {
                Some(state)
            }
        }
    }

    pub fn into_last_state(self) -> Option<PollingState> {
        match self {
            PollError::Lro(e) => e.into_last_state(),
            PollError::Transport { state, .. } => state.map(|s| *s),
            PollError::Exhausted { state, .. } | PollError::DeadlineExceeded { state, .. } => {
                Some(*state)
            }
        }
    }

    /// True for the caller-imposed limits.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PollError::Exhausted { .. } | PollError::DeadlineExceeded { .. }
        )
    }
}
