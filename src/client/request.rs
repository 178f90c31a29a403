//! Request and response types exchanged with a [`Transport`](super::Transport)

use std::fmt;

use futures::stream::{BoxStream, StreamExt};
use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Lazily-read download body, delivered as byte chunks
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// Accept header for download calls; JSON is allowed so error bodies come
/// back through the same endpoint.
pub const DOWNLOAD_ACCEPT: &str = "application/octet-stream, application/json";

/// A single API call: method, absolute URL, headers, optional JSON body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Return the body as a byte stream instead of parsed JSON
    pub stream: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            stream: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any existing value (names are case-insensitive).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Attach a JSON body and its content type.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self.header("Content-Type", "application/json")
    }

    /// Mark the request as a download returning a byte stream.
    pub fn streamed(mut self) -> Self {
        self.stream = true;
        self.header("Accept", DOWNLOAD_ACCEPT)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Body of an [`ApiResponse`]
pub enum ResponseBody {
    Json(Value),
    Stream(ByteStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// HTTP status plus the parsed or streamed body
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    pub fn stream(status: u16, stream: ByteStream) -> Self {
        Self {
            status,
            body: ResponseBody::Stream(stream),
        }
    }

    /// Stream a fully buffered body in fixed-size chunks.
    pub fn from_bytes(status: u16, bytes: Vec<u8>, chunk_size: usize) -> Self {
        let chunks: Vec<Result<Vec<u8>>> = bytes
            .chunks(chunk_size.max(1))
            .map(|c| Ok(c.to_vec()))
            .collect();
        Self::stream(status, futures::stream::iter(chunks).boxed())
    }

    /// The JSON body; a stream where JSON was expected is an invalid response.
    pub fn into_json(self) -> Result<Value> {
        match self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Stream(_) => Err(ApiError::InvalidResponse(
                "expected a JSON body but received a byte stream".to_string(),
            )
            .into()),
        }
    }
}
