//! HTTP execution abstraction.
//!
//! The poller only needs "send a request, get status, headers and body back".
//! Authentication, retries and connection management belong to whatever
//! implements [`HttpExecutor`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use arm_lro_core::{HttpRequest, HttpResponse};

use crate::config::PollerConfig;

/// Trait for executing HTTP requests.
///
/// An `Err` is a transport failure (connect, timeout, TLS). Any HTTP status,
/// including 4xx and 5xx, is an `Ok` response.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// Production HTTP executor using reqwest.
pub struct ReqwestExecutor {
    client: Client,
    default_headers: HashMap<String, String>,
}

impl ReqwestExecutor {
    /// Create a new executor with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            client,
            default_headers: HashMap::new(),
        })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, String> {
        Self::new(Duration::from_secs(30))
    }

    pub fn from_config(config: &PollerConfig) -> Result<Self, String> {
        Self::new(config.request_timeout())
    }

    /// Add a header sent with every request, e.g. `Authorization`.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let url = Url::parse(&request.url)
            .map_err(|e| format!("Invalid URL {:?}: {}", request.url, e))?;
        let method: http::Method = request.method.into();

        let mut req_builder = self.client.request(method, url);

        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await.map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body_text = response.text().await.map_err(|e| e.to_string())?;
        let body = serde_json::from_str(&body_text).unwrap_or(serde_json::Value::Null);

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
            body_text: Some(body_text),
        })
    }
}

/// Mock HTTP executor for testing.
///
/// Returns scripted responses per URL, in order.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Queued responses keyed by request URL. The last one repeats.
        responses: Arc<Mutex<HashMap<String, VecDeque<HttpResponse>>>>,
        /// URLs that fail with a transport error.
        failures: Arc<Mutex<HashMap<String, String>>>,
        /// Per-URL delay before the response is returned.
        latency: Arc<Mutex<HashMap<String, Duration>>>,
        /// Recorded requests for verification.
        recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for a URL.
        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(response);
            self
        }

        /// Fail every request to a URL with a transport error.
        pub fn fail_with(self, url: impl Into<String>, message: impl Into<String>) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(url.into(), message.into());
            self
        }

        /// Hold every request to a URL for `delay` before answering.
        pub fn with_latency(self, url: impl Into<String>, delay: Duration) -> Self {
            self.latency.lock().unwrap().insert(url.into(), delay);
            self
        }

        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.recorded_requests.lock().unwrap().clone()
        }

        pub fn recorded_urls(&self) -> Vec<String> {
            self.recorded_requests()
                .into_iter()
                .map(|request| request.url)
                .collect()
        }
    }

    #[async_trait]
    impl HttpExecutor for MockExecutor {
        async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
            self.recorded_requests.lock().unwrap().push(request.clone());

            let delay = self.latency.lock().unwrap().get(&request.url).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = self.failures.lock().unwrap().get(&request.url) {
                return Err(message.clone());
            }

            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&request.url) {
                Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
                Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
                _ => Ok(HttpResponse::new(404)),
            }
        }
    }
}
