//! Mock transport for testing
//!
//! Replays a scripted sequence of responses and records every request, so
//! protocol tests can run without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::Transport;
use super::fixtures::ok_envelope_with;
use super::request::{ApiRequest, ApiResponse};
use crate::error::{ApiError, Result};

/// Chunk size used when replaying archive downloads
const ARCHIVE_CHUNK_SIZE: usize = 64;

/// A scripted reply, consumed in order
#[derive(Debug, Clone)]
pub enum MockReply {
    /// JSON body with an HTTP status
    Json { status: u16, body: Value },
    /// Streamed archive bytes (HTTP 200)
    Archive(Vec<u8>),
    /// Transport-level failure
    Failure(ApiError),
    /// Never answers, like a hung connection
    Stall,
}

/// Mock request executor.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new()
///     .with_envelope(json!({"result": {"progressId": "ES_1"}}))
///     .await;
///
/// let response = mock.execute(ApiRequest::get("https://x")).await?;
/// assert_eq!(mock.call_count().await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    captured_requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub async fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().await.push_back(reply);
        self
    }

    /// Queue a JSON body with an explicit HTTP status.
    pub async fn with_json(self, status: u16, body: Value) -> Self {
        self.with_reply(MockReply::Json { status, body }).await
    }

    /// Queue a `200 - OK` response. A body without `meta` is wrapped as the
    /// envelope's `result`.
    pub async fn with_envelope(self, body: Value) -> Self {
        let body = if body.get("meta").is_some() {
            body
        } else {
            ok_envelope_with(body.get("result").cloned().unwrap_or(body))
        };
        self.with_json(200, body).await
    }

    /// Queue a streamed archive download.
    pub async fn with_archive(self, bytes: Vec<u8>) -> Self {
        self.with_reply(MockReply::Archive(bytes)).await
    }

    /// Queue a transport failure.
    pub async fn with_failure(self, error: ApiError) -> Self {
        self.with_reply(MockReply::Failure(error)).await
    }

    /// All requests executed so far, in order.
    pub async fn captured_requests(&self) -> Vec<ApiRequest> {
        self.captured_requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.captured_requests.lock().await.len()
    }

    /// Replies not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        self.captured_requests.lock().await.push(request);

        let reply = self.replies.lock().await.pop_front();
        match reply {
            Some(MockReply::Json { status, body }) => Ok(ApiResponse::json(status, body)),
            Some(MockReply::Archive(bytes)) => {
                Ok(ApiResponse::from_bytes(200, bytes, ARCHIVE_CHUNK_SIZE))
            }
            Some(MockReply::Failure(err)) => Err(err.into()),
            Some(MockReply::Stall) => std::future::pending().await,
            None => Err(ApiError::InvalidResponse(format!(
                "MockTransport: no reply scripted for {} {}",
                method, url
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResponseBody;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_in_order_and_captures() {
        let mock = MockTransport::new()
            .with_envelope(json!({"id": 1}))
            .await
            .with_json(503, json!({"meta": {"httpStatus": "503 - Temporary Internal Server Error"}}))
            .await;

        let first = mock.execute(ApiRequest::get("https://a")).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.into_json().unwrap()["result"]["id"], json!(1));

        let second = mock.execute(ApiRequest::post("https://b")).await.unwrap();
        assert_eq!(second.status, 503);

        let requests = mock.captured_requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, "https://b");
        assert_eq!(mock.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_archive_reply_streams() {
        let mock = MockTransport::new().with_archive(vec![0u8; 200]).await;
        let response = mock.execute(ApiRequest::get("https://f").streamed()).await.unwrap();
        assert!(matches!(response.body, ResponseBody::Stream(_)));
    }

    #[tokio::test]
    async fn test_exhausted_script_errors() {
        let mock = MockTransport::new();
        assert!(mock.execute(ApiRequest::get("https://a")).await.is_err());
        assert_eq!(mock.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_reply() {
        let mock = MockTransport::new()
            .with_failure(ApiError::Network("connection reset".to_string()))
            .await;
        let err = mock.execute(ApiRequest::get("https://a")).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
