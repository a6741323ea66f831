use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay Azure recommends between polls when the server sends no Retry-After.
pub const DEFAULT_POLL_DELAY_MS: u64 = 30_000;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Poller settings.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```
/// use arm_lro_http::PollerConfig;
///
/// let config = PollerConfig::from_json(r#"{"max_polls": 40}"#).unwrap();
/// assert_eq!(config.max_polls, Some(40));
/// assert_eq!(config.default_delay_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay between polls when the last response had no Retry-After.
    pub default_delay_ms: u64,

    /// Give up after this many poll requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_polls: Option<u32>,

    /// Give up once this much time has passed since the loop started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Per-request timeout for [`ReqwestExecutor`](crate::ReqwestExecutor).
    pub request_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: DEFAULT_POLL_DELAY_MS,
            max_polls: None,
            timeout_ms: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl PollerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_millis(timeout));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = duration_millis(timeout);
        self
    }

    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
