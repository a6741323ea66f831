//! Narrow typed view of an LRO response body.
//!
//! Only the status fields matter for polling, everything else in the body is
//! ignored.

use serde::{Deserialize, Deserializer};

use crate::types::HttpResponse;

/// Each field is read leniently: a value of the wrong JSON type reads as
/// absent instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingResource {
    #[serde(default, deserialize_with = "lenient_string")]
    pub provisioning_state: Option<String>,

    #[serde(default, deserialize_with = "lenient_properties")]
    pub properties: Option<ResourceProperties>,

    /// Present on Azure-AsyncOperation status resources.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    #[serde(default, deserialize_with = "lenient_string")]
    pub provisioning_state: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn lenient_properties<'de, D>(deserializer: D) -> Result<Option<ResourceProperties>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Why a body could not be projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableBody {
    pub message: String,
}

impl PollingResource {
    /// The body-level status string, if any, in priority order:
    /// `provisioningState`, `properties.provisioningState`, `status`.
    pub fn status_string(&self) -> Option<&str> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.trim().is_empty())
        }

        non_empty(&self.provisioning_state)
            .or_else(|| {
                self.properties
                    .as_ref()
                    .and_then(|p| non_empty(&p.provisioning_state))
            })
            .or_else(|| non_empty(&self.status))
    }

    /// Project a response body.
    ///
    /// An empty body or a JSON value that is not an object yields `Ok(None)`.
    /// A non-empty body that is not JSON at all is an error.
    pub fn from_response(response: &HttpResponse) -> Result<Option<Self>, UnparseableBody> {
        let value = match response.body_text.as_deref() {
            Some(text) if text.trim().is_empty() => return Ok(None),
            Some(text) => serde_json::from_str::<serde_json::Value>(text).map_err(|e| {
                UnparseableBody {
                    message: e.to_string(),
                }
            })?,
            None => response.body.clone(),
        };

        if !value.is_object() {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| UnparseableBody {
                message: e.to_string(),
            })
    }
}
