//! Error types for the Qualtrics client

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The API error behind this error, if there is one.
    ///
    /// Looks through export and pagination wrappers so callers can inspect
    /// the classified kind regardless of which protocol surfaced it.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            Error::Export(ExportError::RetriesExhausted { last, .. }) => Some(last),
            Error::Pagination(PaginationError::PageFailed { source, .. }) => Some(source),
            _ => None,
        }
    }
}

/// Error code and message attached to a failed API response envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error_code.is_none() && self.error_message.is_none()
    }
}

// Renders as a suffix so variants can append it directly after their message.
impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_code, &self.error_message) {
            (Some(code), Some(message)) => write!(f, " [{}] {}", code, message),
            (Some(code), None) => write!(f, " [{}]", code),
            (None, Some(message)) => write!(f, " {}", message),
            (None, None) => Ok(()),
        }
    }
}

/// API-related errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Qualtrics internal server error (500 - Internal Server Error).{0}")]
    ServerInternal(ErrorDetail),

    #[error("Qualtrics is temporarily unavailable (503 - Temporary Internal Server Error).{0}")]
    ServerTemporary(ErrorDetail),

    #[error("Qualtrics gateway timed out (504 - Gateway Timeout).{0}")]
    GatewayTimeout(ErrorDetail),

    #[error("Bad request (400): there was something invalid about the request.{0}")]
    BadRequest(ErrorDetail),

    #[error(
        "Unauthorized (401): the API token could not be authenticated or cannot access this resource.{0}"
    )]
    Unauthorized(ErrorDetail),

    #[error("Forbidden (403): the API user is not authorized to access this resource.{0}")]
    Forbidden(ErrorDetail),

    #[error("Unexpected API status '{status}'.{detail}")]
    Unclassified { status: String, detail: ErrorDetail },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Server-side conditions that are safe to retry with the identical request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::ServerInternal(_) | ApiError::ServerTemporary(_) | ApiError::GatewayTimeout(_)
        )
    }

    /// Error code and message from the response envelope, if any.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            ApiError::ServerInternal(d)
            | ApiError::ServerTemporary(d)
            | ApiError::GatewayTimeout(d)
            | ApiError::BadRequest(d)
            | ApiError::Unauthorized(d)
            | ApiError::Forbidden(d) => Some(d),
            ApiError::Unclassified { detail, .. } => Some(detail),
            ApiError::Network(_) | ApiError::InvalidResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to the Qualtrics API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API token not configured. Set `api_token` or QUALTRICS_API_TOKEN.")]
    MissingApiToken,

    #[error("Data center not configured. Set `data_center` or QUALTRICS_DATA_CENTER.")]
    MissingDataCenter,

    #[error("Invalid data center '{0}': expected a host label such as 'iad1' or 'ca1'")]
    InvalidDataCenter(String),

    #[error("Directory ID not configured. Set `directory_id` or QUALTRICS_DIRECTORY_ID.")]
    MissingDirectoryId,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Export job and archive errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export submission failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ApiError },

    #[error("Export job {job_id} failed at {percent_complete}% complete")]
    JobFailed {
        job_id: String,
        percent_complete: f64,
    },

    #[error("Export job {job_id} did not finish within {waited:?}")]
    DeadlineExceeded { job_id: String, waited: Duration },

    #[error("Export {} was cancelled", .job_id.as_deref().unwrap_or("submission"))]
    Cancelled { job_id: Option<String> },

    #[error("Downloaded export archive is empty")]
    EmptyArchive,

    #[error("Export archive contains no files")]
    NoFiles,

    #[error("Failed to read export archive: {0}")]
    Archive(String),

    #[error("Failed to parse '{file}' as delimited text: {reason}")]
    Table { file: String, reason: String },

    #[error("Export format '{0}' cannot be unpacked into a table")]
    UnsupportedFormat(String),
}

/// Page cursor walk errors
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("Page {page} failed after {discarded} records were fetched: {source}")]
    PageFailed {
        page: usize,
        discarded: usize,
        #[source]
        source: ApiError,
    },

    #[error("Next-page reference repeated on page {page}: {cursor}")]
    RepeatedCursor { page: usize, cursor: String },

    #[error("Collection exceeded the limit of {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },

    #[error("Response has no item array at '{0}'")]
    MissingElements(String),

    #[error("Invalid page URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Input validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidId {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid export option: {0}")]
    InvalidOption(String),
}
