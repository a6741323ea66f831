//! The serializable polling snapshot.
//!
//! A `PollingState` is built once from the response that started an
//! operation, then replaced by a fresh snapshot for every poll response (see
//! [`PollingState::successor`]). At any point it can be written out with
//! [`PollingState::to_json`] and picked up later, possibly by another
//! process, with [`PollingState::from_json`].
//!
//! Only one poller may drive a given state at a time. Persisting a state and
//! continuing to poll it from the same process while another process resumes
//! it will apply responses out of order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{ResponseMetadata, LOGGING_CONTEXT};
use crate::error::Error;
use crate::resource::PollingResource;
use crate::status::OperationStatus;
use crate::types::{HttpRequest, HttpResponse, Method};

/// Sentinel for "no Retry-After seen, use the poller's default delay".
pub const USE_DEFAULT_DELAY: i64 = -1;

fn use_default_delay() -> i64 {
    USE_DEFAULT_DELAY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_context: Option<String>,

    #[serde(default)]
    pub initial_http_method: Method,

    pub status: OperationStatus,

    /// Last HTTP status code observed.
    #[serde(default)]
    pub status_code: u16,

    /// The original PUT/PATCH target; unset for every other method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_operation_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_link: Option<String>,

    #[serde(default = "use_default_delay")]
    pub retry_after_millis: i64,

    /// Body status string exactly as the server sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl PollingState {
    /// Build a state from classified response metadata and an optional
    /// projection of the response body.
    pub fn from_metadata(meta: &ResponseMetadata, resource: Option<&PollingResource>) -> Self {
        let provisioning_state = resource
            .and_then(PollingResource::status_string)
            .map(str::to_string);

        let status = provisioning_state
            .as_deref()
            .and_then(OperationStatus::from_provisioning_state)
            .unwrap_or_else(|| OperationStatus::from_status_code(meta.status_code));

        let resource_uri = meta
            .method
            .polls_original_resource()
            .then(|| meta.request_url.clone());

        Self {
            logging_context: meta.logging_context.clone(),
            initial_http_method: meta.method,
            status,
            status_code: meta.status_code,
            resource_uri,
            async_operation_link: meta.async_operation_header.clone(),
            location_link: meta.location_header.clone(),
            retry_after_millis: meta.retry_after_millis(),
            provisioning_state,
        }
    }

    /// Build the initial state from the exchange that started the operation.
    ///
    /// A body that is not JSON is ignored here and the status falls back to
    /// the status code; many operations answer the first call with an empty
    /// or non-JSON body.
    pub fn from_initial_response(request: &HttpRequest, response: &HttpResponse) -> Self {
        let meta = ResponseMetadata::from_exchange(request, response);
        let resource = PollingResource::from_response(response).unwrap_or_else(|e| {
            tracing::warn!(
                url = %request.url,
                error = %e.message,
                "ignoring unparseable body on initial LRO response"
            );
            None
        });

        Self::from_metadata(&meta, resource.as_ref())
    }

    /// Derive the next snapshot from a poll response.
    ///
    /// The logging context, initial method and resource URI never change.
    /// A link is replaced only when the response carries a new one. The
    /// Retry-After delay is always taken from the new response.
    pub fn successor(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> Result<Self, Error> {
        let resource = PollingResource::from_response(response).map_err(|e| {
            Error::MalformedPollResponse {
                url: request.url.clone(),
                message: e.message,
                state: Box::new(self.clone()),
            }
        })?;

        let meta = ResponseMetadata::from_exchange(request, response);
        let next = Self::from_metadata(&meta, resource.as_ref());

        Ok(Self {
            logging_context: self.logging_context.clone(),
            initial_http_method: self.initial_http_method,
            resource_uri: self.resource_uri.clone(),
            async_operation_link: next
                .async_operation_link
                .or_else(|| self.async_operation_link.clone()),
            location_link: next.location_link.or_else(|| self.location_link.clone()),
            ..next
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when the operation failed on a 5xx, which may be transient.
    /// The status stays `Failed` either way.
    pub fn is_server_error(&self) -> bool {
        self.status == OperationStatus::Failed && (500..600).contains(&self.status_code)
    }

    /// The URL the next poll goes to.
    ///
    /// Azure-AsyncOperation first, then Location, then the original resource
    /// for PUT/PATCH. Blank links are skipped.
    pub fn poll_target(&self) -> Result<&str, Error> {
        fn usable(link: &Option<String>) -> Option<&str> {
            link.as_deref().filter(|link| !link.trim().is_empty())
        }

        usable(&self.async_operation_link)
            .or_else(|| usable(&self.location_link))
            .or_else(|| {
                usable(&self.resource_uri)
                    .filter(|_| self.initial_http_method.polls_original_resource())
            })
            .ok_or_else(|| Error::NoPollTarget {
                state: Box::new(self.clone()),
            })
    }

    /// The GET to issue for the next poll.
    pub fn poll_request(&self) -> Result<HttpRequest, Error> {
        let mut request = HttpRequest::get(self.poll_target()?);
        if let Some(context) = &self.logging_context {
            request = request.with_header(LOGGING_CONTEXT, context.clone());
        }
        Ok(request)
    }

    /// How long to wait before the next poll.
    pub fn poll_delay(&self, default: Duration) -> Duration {
        u64::try_from(self.retry_after_millis)
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    /// Where the final resource can be read once the operation succeeded.
    ///
    /// PUT and PATCH read back the original resource; POST and DELETE read
    /// the Location link when the server gave one.
    pub fn final_resource_target(&self) -> Option<&str> {
        match self.initial_http_method {
            Method::PUT | Method::PATCH => self.resource_uri.as_deref(),
            Method::POST | Method::DELETE => self.location_link.as_deref(),
            _ => None,
        }
    }

    /// A terminal snapshot for a caller-canceled operation.
    pub fn canceled(&self) -> Self {
        Self {
            status: OperationStatus::Canceled,
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::StateCorrupt {
            message: e.to_string(),
        })
    }

    /// Restore a state written by [`to_json`](Self::to_json).
    ///
    /// Unknown fields are ignored; every field except `status` has a default.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let corrupt = |e: serde_json::Error| Error::StateCorrupt {
            message: e.to_string(),
        };

        let value: serde_json::Value = serde_json::from_str(text).map_err(corrupt)?;
        if !value.is_object() {
            return Err(Error::StateCorrupt {
                message: "expected a JSON object".to_string(),
            });
        }

        serde_json::from_value(value).map_err(corrupt)
    }
}

impl std::fmt::Display for PollingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}
