use crate::state::PollingState;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Serialized state is not a well-formed record or lacks `status`.
    #[error("Polling state is corrupt: {message}")]
    StateCorrupt { message: String },

    /// The operation is not finished but there is nothing left to poll.
    #[error("Operation is {} but the server supplied no link to poll", .state.status)]
    NoPollTarget { state: Box<PollingState> },

    /// A poll response arrived but could not be classified.
    #[error("Malformed poll response from {url}: {message}")]
    MalformedPollResponse {
        url: String,
        message: String,
        state: Box<PollingState>,
    },

    #[error("Invalid state key: {key:?}")]
    InvalidKey { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The last known-good state, for errors raised mid-operation.
    pub fn last_state(&self) -> Option<&PollingState> {
        match self {
            Error::NoPollTarget { state } | Error::MalformedPollResponse { state, .. } => {
                Some(state)
            }
            _ => None,
        }
    }

    /// Recover the last known-good state by value.
    pub fn into_last_state(self) -> Option<PollingState> {
        match self {
            Error::NoPollTarget { state } | Error::MalformedPollResponse { state, .. } => {
                Some(*state)
            }
            _ => None,
        }
    }
}
