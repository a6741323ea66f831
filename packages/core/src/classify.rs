//! Extract LRO metadata from the exchange that started (or advanced) an operation.

use crate::types::{HttpRequest, HttpResponse, Method};

pub const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
pub const LOCATION: &str = "Location";
pub const RETRY_AFTER: &str = "Retry-After";
pub const LOGGING_CONTEXT: &str = "x-ms-logging-context";

/// What a single response says about the operation it belongs to.
///
/// Header values are kept exactly as received. An empty header is still
/// `Some("")`, distinct from a missing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub method: Method,
    pub status_code: u16,
    pub async_operation_header: Option<String>,
    pub location_header: Option<String>,
    pub retry_after_header: Option<String>,
    pub request_url: String,
    pub logging_context: Option<String>,
}

impl ResponseMetadata {
    pub fn from_exchange(request: &HttpRequest, response: &HttpResponse) -> Self {
        let owned = |value: Option<&str>| value.map(str::to_string);

        Self {
            method: request.method,
            status_code: response.status,
            async_operation_header: owned(response.header(AZURE_ASYNC_OPERATION)),
            location_header: owned(response.header(LOCATION)),
            retry_after_header: owned(response.header(RETRY_AFTER)),
            request_url: request.url.clone(),
            logging_context: owned(
                request
                    .header(LOGGING_CONTEXT)
                    .or_else(|| response.header(LOGGING_CONTEXT)),
            ),
        }
    }

    /// Retry-After in milliseconds, or -1 when absent or not a whole number
    /// of seconds.
    pub fn retry_after_millis(&self) -> i64 {
        self.retry_after_header
            .as_deref()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|seconds| *seconds >= 0)
            .and_then(|seconds| seconds.checked_mul(1000))
            .unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(response: HttpResponse) -> ResponseMetadata {
        ResponseMetadata::from_exchange(&HttpRequest::put("https://arm/vm1"), &response)
    }

    #[test]
    fn extracts_headers_and_request_info() {
        let meta = classify(
            HttpResponse::new(202)
                .with_header("Azure-AsyncOperation", "https://x/op1")
                .with_header("Location", "https://x/loc1")
                .with_header("Retry-After", "6"),
        );

        assert_eq!(meta.method, Method::PUT);
        assert_eq!(meta.status_code, 202);
        assert_eq!(meta.async_operation_header.as_deref(), Some("https://x/op1"));
        assert_eq!(meta.location_header.as_deref(), Some("https://x/loc1"));
        assert_eq!(meta.retry_after_header.as_deref(), Some("6"));
        assert_eq!(meta.request_url, "https://arm/vm1");
    }

    #[test]
    fn retry_after_seconds_become_millis() {
        let meta = classify(HttpResponse::new(202).with_header("Retry-After", "5"));
        assert_eq!(meta.retry_after_millis(), 5000);

        let meta = classify(HttpResponse::new(202).with_header("retry-after", " 0 "));
        assert_eq!(meta.retry_after_millis(), 0);
    }

    #[test]
    fn absent_or_invalid_retry_after_is_minus_one() {
        assert_eq!(classify(HttpResponse::new(202)).retry_after_millis(), -1);

        for value in ["soon", "1.5", "-3", "", "Wed, 21 Oct 2015 07:28:00 GMT"] {
            let meta = classify(HttpResponse::new(202).with_header("Retry-After", value));
            assert_eq!(meta.retry_after_millis(), -1, "{value:?}");
        }
    }

    #[test]
    fn empty_link_is_not_missing_link() {
        let meta = classify(HttpResponse::new(202).with_header("Location", ""));
        assert_eq!(meta.location_header.as_deref(), Some(""));
        assert_eq!(meta.async_operation_header, None);
    }

    #[test]
    fn logging_context_prefers_request_header() {
        let request = HttpRequest::delete("https://arm/rg").with_header(LOGGING_CONTEXT, "req-ctx");
        let response = HttpResponse::new(202).with_header(LOGGING_CONTEXT, "resp-ctx");
        let meta = ResponseMetadata::from_exchange(&request, &response);
        assert_eq!(meta.logging_context.as_deref(), Some("req-ctx"));

        let request = HttpRequest::delete("https://arm/rg");
        let meta = ResponseMetadata::from_exchange(&request, &response);
        assert_eq!(meta.logging_context.as_deref(), Some("resp-ctx"));
    }
}
