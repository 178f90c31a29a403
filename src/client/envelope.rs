//! Qualtrics response envelope: `{ "meta": {...}, "result": {...} }`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ErrorDetail, Result};

/// The `meta` block every Qualtrics response carries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// Status line, e.g. `200 - OK`
    pub http_status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// `meta.error` on failed responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ResponseMeta {
    /// Read `meta` out of a response body, if it has one.
    pub fn from_body(body: &Value) -> Option<Self> {
        body.get("meta")
            .and_then(|meta| serde_json::from_value(meta.clone()).ok())
    }

    pub fn detail(&self) -> ErrorDetail {
        match &self.error {
            Some(err) => ErrorDetail {
                error_code: err.error_code.clone(),
                error_message: err.error_message.clone(),
            },
            None => ErrorDetail::default(),
        }
    }
}

/// Deserialize the `result` member of a successful response.
pub fn parse_result<T: DeserializeOwned>(body: &Value) -> Result<T> {
    let result = body
        .get("result")
        .ok_or_else(|| ApiError::InvalidResponse("response has no 'result' member".to_string()))?;

    serde_json::from_value(result.clone())
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse result: {}", e)).into())
}
