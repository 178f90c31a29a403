//! Qualtrics API client plumbing
//!
//! The [`Transport`] trait is the request executor every protocol runs on;
//! [`QualtricsClient`] is its HTTP implementation.

use async_trait::async_trait;

use crate::error::Result;

pub mod classify;
pub mod envelope;
#[cfg(test)]
pub mod fixtures;
#[cfg(test)]
pub mod mock;
pub mod pagination;
pub mod qualtrics;
pub mod request;

pub use classify::{Classification, ErrorKind, classify, ensure_success};
pub use envelope::{ResponseMeta, parse_result};
#[cfg(test)]
pub use mock::MockTransport;
pub use pagination::{MAX_PAGE_SIZE, NextPage, Page, PageSpec, PageWalker, PaginationParams, Record};
pub use qualtrics::QualtricsClient;
pub use request::{ApiRequest, ApiResponse, ByteStream, ResponseBody};

/// Request executor: performs a single HTTP call.
///
/// Implementations do not retry and do not classify API errors; they fail
/// only on transport problems or unparseable JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).execute(request).await
    }
}
