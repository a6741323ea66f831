//! # arm-lro-core
//!
//! Client-side state machine for Azure long-running operations (LROs).
//!
//! An LRO starts with a PUT, PATCH, DELETE or POST that returns right away.
//! The response carries a status code and, usually, follow-up links in the
//! `Azure-AsyncOperation` and `Location` headers plus a `Retry-After` hint.
//! This crate turns such a response into a [`PollingState`], works out where
//! and when to poll next, and derives a new snapshot from every poll
//! response. It performs no network I/O; see `arm-lro-http` for the poll loop.
//!
//! ```
//! use arm_lro_core::{HttpRequest, HttpResponse, OperationStatus, PollingState};
//!
//! let request = HttpRequest::put("https://management.azure.com/vm1");
//! let response = HttpResponse::new(202)
//!     .with_header("Azure-AsyncOperation", "https://x/op1")
//!     .with_header("Retry-After", "6");
//!
//! let state = PollingState::from_initial_response(&request, &response);
//! assert_eq!(state.status, OperationStatus::InProgress);
//! assert_eq!(state.poll_target().unwrap(), "https://x/op1");
//!
//! // Persist and resume elsewhere.
//! let resumed = PollingState::from_json(&state.to_json().unwrap()).unwrap();
//! assert_eq!(resumed, state);
//! ```

pub mod classify;
pub mod error;
pub mod resource;
pub mod state;
pub mod status;
pub mod store;
pub mod types;

pub use classify::ResponseMetadata;
pub use error::Error;
pub use resource::PollingResource;
pub use state::{PollingState, USE_DEFAULT_DELAY};
pub use status::OperationStatus;
pub use store::{FileStateStore, InMemoryStateStore, StateStore};
pub use types::{HttpRequest, HttpResponse, Method};
