//! Error classification for API responses
//!
//! Maps the `meta.httpStatus` line of a response envelope (or, when the body
//! has no envelope, the numeric HTTP status) onto a fixed set of kinds.
//! Both the export poller and the page walker consult this before deciding
//! to retry, abort, or continue.

use serde_json::Value;

use super::envelope::ResponseMeta;
use crate::error::{ApiError, ErrorDetail};

/// Classified outcome of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `200 - OK`
    Ok,
    /// `500 - Internal Server Error`
    ServerInternal,
    /// `503 - Temporary Internal Server Error`
    ServerTemporary,
    /// `504 - Gateway Timeout`
    GatewayTimeout,
    /// `400 - Bad Request`
    BadRequest,
    /// `401 - Unauthorized`
    Unauthorized,
    /// `403 - Forbidden`
    Forbidden,
    /// Anything else; still surfaced as an error
    Unclassified,
}

impl ErrorKind {
    /// Classify a status line such as `503 - Temporary Internal Server Error`.
    ///
    /// Only the leading three-digit code is significant.
    pub fn from_http_status(status: &str) -> Self {
        let code = status
            .trim()
            .get(..3)
            .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|c| c.parse::<u16>().ok());

        match code {
            Some(code) => Self::from_status_code(code),
            None => ErrorKind::Unclassified,
        }
    }

    pub fn from_status_code(code: u16) -> Self {
        match code {
            200 => ErrorKind::Ok,
            500 => ErrorKind::ServerInternal,
            503 => ErrorKind::ServerTemporary,
            504 => ErrorKind::GatewayTimeout,
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            _ => ErrorKind::Unclassified,
        }
    }

    pub fn is_ok(self) -> bool {
        self == ErrorKind::Ok
    }

    /// 500, 503 and 504 are transient and safe to retry unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::ServerInternal | ErrorKind::ServerTemporary | ErrorKind::GatewayTimeout
        )
    }

    /// Errors that retrying the identical request cannot fix.
    pub fn is_terminal(self) -> bool {
        !self.is_ok() && !self.is_retryable()
    }
}

/// Kind plus the status line and error detail kept for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub http_status: String,
    pub detail: ErrorDetail,
}

impl Classification {
    pub fn from_meta(meta: &ResponseMeta) -> Self {
        Self {
            kind: ErrorKind::from_http_status(&meta.http_status),
            http_status: meta.http_status.clone(),
            detail: meta.detail(),
        }
    }

    /// Convert to the matching [`ApiError`], or `None` for `Ok`.
    pub fn into_error(self) -> Option<ApiError> {
        let detail = self.detail;
        match self.kind {
            ErrorKind::Ok => None,
            ErrorKind::ServerInternal => Some(ApiError::ServerInternal(detail)),
            ErrorKind::ServerTemporary => Some(ApiError::ServerTemporary(detail)),
            ErrorKind::GatewayTimeout => Some(ApiError::GatewayTimeout(detail)),
            ErrorKind::BadRequest => Some(ApiError::BadRequest(detail)),
            ErrorKind::Unauthorized => Some(ApiError::Unauthorized(detail)),
            ErrorKind::Forbidden => Some(ApiError::Forbidden(detail)),
            ErrorKind::Unclassified => Some(ApiError::Unclassified {
                status: self.http_status,
                detail,
            }),
        }
    }
}

/// Classify a response from its HTTP status and JSON body.
///
/// The envelope's `meta.httpStatus` wins when present.
pub fn classify(status: u16, body: &Value) -> Classification {
    match ResponseMeta::from_body(body) {
        Some(meta) => Classification::from_meta(&meta),
        None => Classification {
            kind: ErrorKind::from_status_code(status),
            http_status: status.to_string(),
            detail: ErrorDetail::default(),
        },
    }
}

/// Fail with the classified [`ApiError`] unless the response is `Ok`.
pub fn ensure_success(status: u16, body: &Value) -> std::result::Result<(), ApiError> {
    match classify(status, body).into_error() {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
