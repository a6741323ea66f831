//! # arm-lro-http
//!
//! Async poll loop for Azure long-running operations, built on the state
//! machine in `arm-lro-core`.
//!
//! ## Usage
//!
//! ```ignore
//! use arm_lro_http::{Poller, PollerConfig, ReqwestExecutor};
//! use arm_lro_core::HttpRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! let executor = ReqwestExecutor::with_default_timeout()?
//!     .with_default_header("Authorization", format!("Bearer {token}"));
//! let poller = Poller::with_config(executor, PollerConfig::default().with_max_polls(120));
//!
//! // Start the operation; the state can be persisted from here on.
//! let state = poller.begin(&HttpRequest::delete(resource_group_url)).await?;
//! store.save("rg-delete", &state)?;
//!
//! // Later, possibly in another process:
//! let state = store.load("rg-delete")?.unwrap();
//! let done = poller
//!     .run_with(state, &CancellationToken::new(), |s| {
//!         let _ = store.save("rg-delete", s);
//!     })
//!     .await?;
//! ```
//!
//! ## Seams
//!
//! [`HttpExecutor`] is the only dependency on a transport. [`ReqwestExecutor`]
//! is the production implementation; anything that can send a request and
//! return status, headers and body will do.

pub mod config;
pub mod error;
pub mod executor;
pub mod poller;

pub use config::PollerConfig;
pub use error::PollError;
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use poller::Poller;

pub use tokio_util::sync::CancellationToken;
