//! reqwest-backed request executor

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::Transport;
use super::request::{ApiRequest, ApiResponse};
use crate::error::{ApiError, Error, Result};

/// Deadline for a whole non-streamed call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Qualtrics HTTP client.
///
/// Executes exactly one HTTP call per [`Transport::execute`]; retries and
/// status classification belong to the calling protocol. Streamed downloads
/// are not bounded by the request timeout, only by the connect timeout.
#[derive(Debug, Clone)]
pub struct QualtricsClient {
    http: HttpClient,
    request_timeout: Duration,
}

impl QualtricsClient {
    /// Create a new client with the default timeouts
    pub fn new() -> Result<Self> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("qualtrics-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Wrap an existing reqwest client (custom proxies, TLS).
    pub fn with_http_client(http: HttpClient) -> Self {
        Self {
            http,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the deadline for non-streamed calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"))
}

#[async_trait]
impl Transport for QualtricsClient {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        if !request.stream {
            builder = builder.timeout(self.request_timeout);
        }

        let response = builder.send().await.map_err(ApiError::from)?;
        let status = response.status();

        if request.stream && status.is_success() && !is_json(&response) {
            debug!("Streaming download body ({})", status);
            let stream = response
                .bytes_stream()
                .map(|chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| Error::from(ApiError::from(e)))
                })
                .boxed();
            return Ok(ApiResponse::stream(status.as_u16(), stream));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::from(e)
            } else {
                ApiError::InvalidResponse(format!("Failed to read response: {}", e))
            }
        })?;

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(ApiResponse::json(status.as_u16(), value)),
            // Gateways answer errors with HTML; let the status code speak
            Err(_) if !status.is_success() => Ok(ApiResponse::json(status.as_u16(), Value::Null)),
            Err(e) => Err(ApiError::InvalidResponse(format!(
                "Failed to parse response as JSON: {}. Body was: {}",
                e,
                text.chars().take(200).collect::<String>()
            ))
            .into()),
        }
    }
}
