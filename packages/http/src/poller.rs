//! The poll loop.
//!
//! ```text
//! NotStarted ─┐
//!             ├─> InProgress ─┬─> Succeeded
//!             │               ├─> Failed
//!             └───────────────┴─> Canceled
//! ```
//!
//! Each tick resolves the next target from the current snapshot, waits the
//! Retry-After delay (or the configured default), GETs the target and derives
//! the successor snapshot. Ticks of one operation are strictly sequential.
//! A `Poller` holds no per-operation state, so one poller can drive any
//! number of operations concurrently.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use arm_lro_core::{HttpRequest, HttpResponse, PollingState};

use crate::config::PollerConfig;
use crate::error::PollError;
use crate::executor::HttpExecutor;

pub struct Poller<E> {
    executor: E,
    config: PollerConfig,
}

impl<E: HttpExecutor> Poller<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, PollerConfig::default())
    }

    pub fn with_config(executor: E, config: PollerConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Send the request that starts an operation and build its initial state.
    pub async fn begin(&self, request: &HttpRequest) -> Result<PollingState, PollError> {
        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|message| PollError::Transport {
                url: request.url.clone(),
                message,
                state: None,
            })?;

        let state = PollingState::from_initial_response(request, &response);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = %state.status,
            status_code = state.status_code,
            "started long-running operation"
        );
        Ok(state)
    }

    /// Poll once, without waiting, and return the successor snapshot.
    ///
    /// A terminal state is returned unchanged and no request is sent.
    pub async fn poll_once(&self, state: &PollingState) -> Result<PollingState, PollError> {
        if state.is_terminal() {
            return Ok(state.clone());
        }
        let request = state.poll_request()?;
        self.tick(state, &request).await
    }

    /// Poll until the operation reaches a terminal status.
    ///
    /// Cancelling `cancel` stops the loop with a `Canceled` snapshot.
    pub async fn run(
        &self,
        state: PollingState,
        cancel: &CancellationToken,
    ) -> Result<PollingState, PollError> {
        self.run_with(state, cancel, |_| {}).await
    }

    /// Like [`run`](Self::run), handing every new snapshot to `on_snapshot`
    /// before the next wait. Use it to checkpoint progress into a
    /// [`StateStore`](arm_lro_core::StateStore).
    pub async fn run_with<F>(
        &self,
        state: PollingState,
        cancel: &CancellationToken,
        mut on_snapshot: F,
    ) -> Result<PollingState, PollError>
    where
        F: FnMut(&PollingState),
    {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut state = state;

        while !state.is_terminal() {
            let request = state.poll_request()?;

            if let Some(max_polls) = self.config.max_polls {
                if polls >= max_polls {
                    tracing::warn!(polls, status = %state.status, "poll budget exhausted");
                    return Err(PollError::Exhausted {
                        polls,
                        state: Box::new(state),
                    });
                }
            }

            let delay = state.poll_delay(self.config.default_delay());
            let deadline = self.config.timeout().map(|timeout| started + timeout);
            let wake = match deadline {
                Some(deadline) => (Instant::now() + delay).min(deadline),
                None => Instant::now() + delay,
            };

            tracing::debug!(
                target_url = %request.url,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                tick = polls + 1,
                "waiting before next poll"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(self.cancel(&state, &mut on_snapshot)),
                () = tokio::time::sleep_until(wake) => {}
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let elapsed = started.elapsed();
                tracing::warn!(?elapsed, status = %state.status, "poll deadline exceeded");
                return Err(PollError::DeadlineExceeded {
                    elapsed,
                    state: Box::new(state),
                });
            }

            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(self.cancel(&state, &mut on_snapshot)),
                next = self.tick(&state, &request) => next?,
            };

            polls += 1;
            on_snapshot(&next);
            state = next;
        }

        tracing::info!(
            status = %state.status,
            status_code = state.status_code,
            polls,
            "long-running operation finished"
        );
        Ok(state)
    }

    /// GET the final resource of a succeeded operation.
    ///
    /// Returns `None` when the operation did not succeed or has nowhere to
    /// read the result from.
    pub async fn fetch_final_resource(
        &self,
        state: &PollingState,
    ) -> Result<Option<HttpResponse>, PollError> {
        if state.status != arm_lro_core::OperationStatus::Succeeded {
            return Ok(None);
        }
        let Some(target) = state.final_resource_target() else {
            return Ok(None);
        };

        let mut request = HttpRequest::get(target);
        if let Some(context) = &state.logging_context {
            request =
                request.with_header(arm_lro_core::classify::LOGGING_CONTEXT, context.clone());
        }

        let response = self.send(state, &request).await?;
        Ok(Some(response))
    }

    async fn tick(
        &self,
        state: &PollingState,
        request: &HttpRequest,
    ) -> Result<PollingState, PollError> {
        let response = self.send(state, request).await?;

        state.successor(request, &response).map_err(|e| {
            tracing::warn!(url = %request.url, error = %e, "malformed poll response");
            PollError::from(e)
        })
    }

    async fn send(
        &self,
        state: &PollingState,
        request: &HttpRequest,
    ) -> Result<HttpResponse, PollError> {
        self.executor.execute(request).await.map_err(|message| {
            tracing::warn!(url = %request.url, error = %message, "poll request failed");
            PollError::Transport {
                url: request.url.clone(),
                message,
                state: Some(Box::new(state.clone())),
            }
        })
    }

    fn cancel<F>(&self, state: &PollingState, on_snapshot: &mut F) -> PollingState
    where
        F: FnMut(&PollingState),
    {
        tracing::info!(status = %state.status, "long-running operation polling canceled");
        let canceled = state.canceled();
        on_snapshot(&canceled);
        canceled
    }
}
