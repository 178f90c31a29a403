//! Pagination helpers and the page cursor walker
//!
//! Qualtrics collections answer with
//! `{"result": {"elements": [...], "nextPage": <url-or-null>}}`. The walker
//! follows `nextPage` (a fully formed URL) until it is null and returns every
//! element in arrival order. Endpoints that omit `nextPage` fall back to
//! offset paging: a full page is followed by the same URL with `offset`
//! advanced by the page size.

use std::collections::HashSet;

use log::{debug, warn};
use reqwest::{Method, Url};
use serde_json::{Map, Value};

use super::Transport;
use super::classify::ensure_success;
use crate::config::Credentials;
use crate::error::{ApiError, PaginationError, Result};

/// Largest page size requested from Qualtrics list endpoints.
pub const MAX_PAGE_SIZE: usize = 500;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One collection item; field order follows the response (or the field list).
pub type Record = Map<String, Value>;

/// Pagination parameters for list requests.
///
/// # Example
/// ```ignore
/// let params = PaginationParams::new().page_size(250).offset(500);
/// let url = params.apply_to("https://iad1.qualtrics.com/API/v3/directories/POOL_1/contacts")?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationParams {
    /// Number of items per page (default: 100, max: 500)
    pub page_size: Option<usize>,
    /// Index of the first item to return
    pub offset: Option<usize>,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Requested page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_page_size(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Query pairs using Qualtrics parameter names (`pageSize`, `offset`).
    ///
    /// `pageSize` is always present.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("pageSize", self.effective_page_size().to_string())];
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }

    /// Append the query pairs to a URL, replacing any existing ones.
    pub fn apply_to(&self, url: &str) -> Result<String> {
        let mut parsed = parse_url(url)?;
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(k, _)| k != "pageSize" && k != "offset")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut query = parsed.query_pairs_mut();
            query.clear().extend_pairs(kept);
            for (key, value) in self.to_query_params() {
                query.append_pair(key, &value);
            }
        }
        Ok(parsed.into())
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| {
        PaginationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// `offset` query value of a URL, 0 when absent.
fn offset_of(url: &str) -> usize {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "offset")
                .and_then(|(_, v)| v.parse().ok())
        })
        .unwrap_or(0)
}

/// Where the walk goes after a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Server-supplied absolute URL of the next page
    Url(String),
    /// No next-page field; a full page implies more items at this offset
    Offset(usize),
    /// Last page
    Done,
}

/// A single parsed page
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<Record>,
    pub next: NextPage,
}

/// Key-extraction scheme for a collection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    /// JSON pointer to the item array
    pub elements_pointer: String,
    /// JSON pointer to the next-page reference
    pub next_page_pointer: String,
    /// Fields projected from each item; `None` keeps whole items
    pub fields: Option<Vec<String>>,
    /// Page size the request asked for (drives the offset fallback)
    pub page_size: usize,
}

impl PageSpec {
    pub fn new(page_size: usize) -> Self {
        Self {
            elements_pointer: "/result/elements".to_string(),
            next_page_pointer: "/result/nextPage".to_string(),
            fields: None,
            page_size,
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn elements_at(mut self, pointer: impl Into<String>) -> Self {
        self.elements_pointer = pointer.into();
        self
    }

    pub fn next_page_at(mut self, pointer: impl Into<String>) -> Self {
        self.next_page_pointer = pointer.into();
        self
    }

    /// Extract items and the next-page reference from a response body.
    ///
    /// `offset` is the offset the page was requested at.
    pub fn parse_page(&self, body: &Value, offset: usize) -> Result<Page> {
        let elements = body
            .pointer(&self.elements_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| PaginationError::MissingElements(self.elements_pointer.clone()))?;

        let records = elements
            .iter()
            .map(|element| self.project(element))
            .collect::<Result<Vec<_>>>()?;

        let next = match body.pointer(&self.next_page_pointer) {
            Some(Value::String(url)) if !url.trim().is_empty() => NextPage::Url(url.clone()),
            Some(Value::String(_)) | Some(Value::Null) => NextPage::Done,
            Some(other) => {
                return Err(ApiError::InvalidResponse(format!(
                    "next-page reference must be a string or null, got {}",
                    other
                ))
                .into());
            }
            // Can't tell a final full page from a middle one here; the extra
            // request it costs returns an empty page.
            None if self.page_size > 0 && records.len() == self.page_size => {
                NextPage::Offset(offset + self.page_size)
            }
            None => NextPage::Done,
        };

        Ok(Page { records, next })
    }

    fn project(&self, element: &Value) -> Result<Record> {
        let object = element.as_object().ok_or_else(|| {
            ApiError::InvalidResponse(format!("collection item is not an object: {}", element))
        })?;

        let Some(fields) = &self.fields else {
            return Ok(object.clone());
        };

        Ok(fields
            .iter()
            .map(|field| {
                let value = object.get(field).cloned().unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect())
    }
}

/// Materializes a paginated collection into one ordered sequence.
///
/// Any non-`Ok` page aborts the walk and discards what was fetched so far.
pub struct PageWalker<'a, T: Transport + ?Sized> {
    transport: &'a T,
    credentials: &'a Credentials,
    spec: PageSpec,
    max_pages: usize,
}

impl<'a, T: Transport + ?Sized> PageWalker<'a, T> {
    pub fn new(transport: &'a T, credentials: &'a Credentials, spec: PageSpec) -> Self {
        Self {
            transport,
            credentials,
            spec,
            max_pages: usize::MAX,
        }
    }

    /// Fail instead of following more than `max_pages` pages.
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn spec(&self) -> &PageSpec {
        &self.spec
    }

    /// Fetch a single page.
    pub async fn fetch_page(&self, url: &str, offset: usize) -> Result<Page> {
        let response = self
            .transport
            .execute(self.credentials.request_url(Method::GET, url))
            .await?;
        let status = response.status;
        let body = response.into_json()?;

        ensure_success(status, &body)?;
        self.spec.parse_page(&body, offset)
    }

    /// Walk from `first_url` until the next-page reference is null.
    pub async fn walk(&self, first_url: &str) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut url = first_url.to_string();
        let mut offset = offset_of(&url);
        let mut pages = 0usize;

        loop {
            if pages >= self.max_pages {
                return Err(PaginationError::PageLimitExceeded {
                    max_pages: self.max_pages,
                }
                .into());
            }
            pages += 1;
            visited.insert(url.clone());

            debug!("Fetching page {} from {}", pages, url);
            let page = match self.fetch_page(&url, offset).await {
                Ok(page) => page,
                Err(crate::error::Error::Api(source)) => {
                    warn!(
                        "Page {} failed, discarding {} fetched records: {}",
                        pages,
                        records.len(),
                        source
                    );
                    return Err(PaginationError::PageFailed {
                        page: pages,
                        discarded: records.len(),
                        source,
                    }
                    .into());
                }
                Err(err) => return Err(err),
            };

            debug!("Page {} returned {} records", pages, page.records.len());
            records.extend(page.records);

            let next_url = match page.next {
                NextPage::Done => break,
                NextPage::Url(next) => next,
                NextPage::Offset(next_offset) => PaginationParams::new()
                    .page_size(self.spec.page_size)
                    .offset(next_offset)
                    .apply_to(&url)?,
            };

            if visited.contains(&next_url) {
                return Err(PaginationError::RepeatedCursor {
                    page: pages,
                    cursor: next_url,
                }
                .into());
            }
            offset = offset_of(&next_url);
            url = next_url;
        }

        debug!("Fetched {} records across {} pages", records.len(), pages);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use crate::client::fixtures::{contact_elements, error_envelope, page_envelope};
    use crate::error::Error;
    use serde_json::json;

    const BASE: &str = "https://iad1.qualtrics.com/API/v3/directories/POOL_1/contacts";

    fn credentials() -> Credentials {
        Credentials::new("token", "iad1").unwrap()
    }

    fn first_url() -> String {
        PaginationParams::new().page_size(100).apply_to(BASE).unwrap()
    }

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::new();
        let query = params.to_query_params();
        assert_eq!(query, vec![("pageSize", "100".to_string())]);
    }

    #[test]
    fn test_pagination_params_clamped() {
        assert_eq!(PaginationParams::new().page_size(0).effective_page_size(), 1);
        assert_eq!(
            PaginationParams::new().page_size(10_000).effective_page_size(),
            MAX_PAGE_SIZE
        );
    }

    #[test]
    fn test_apply_to_replaces_existing_pairs() {
        let url = PaginationParams::new()
            .page_size(50)
            .offset(100)
            .apply_to("https://x.qualtrics.com/API/v3/mailinglists?pageSize=10&surveyId=SV_1")
            .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("surveyId".to_string(), "SV_1".to_string()),
                ("pageSize".to_string(), "50".to_string()),
                ("offset".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_page_projects_fields() {
        let spec = PageSpec::new(100).fields(&["contactId", "email", "phone"]);
        let body = page_envelope(
            vec![json!({"contactId": "CID_1", "email": "a@example.com", "extra": 1})],
            None,
        );

        let page = spec.parse_page(&body, 0).unwrap();
        assert_eq!(page.next, NextPage::Done);
        let record = &page.records[0];
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, vec!["contactId", "email", "phone"]);
        assert_eq!(record["phone"], Value::Null);
    }

    #[test]
    fn test_parse_page_offset_fallback() {
        let spec = PageSpec::new(2);
        let full = json!({"result": {"elements": [{"id": 1}, {"id": 2}]}});
        assert_eq!(spec.parse_page(&full, 4).unwrap().next, NextPage::Offset(6));

        let short = json!({"result": {"elements": [{"id": 1}]}});
        assert_eq!(spec.parse_page(&short, 4).unwrap().next, NextPage::Done);
    }

    #[test]
    fn test_parse_page_explicit_field_wins() {
        // A full page with an explicit null is still the last page
        let spec = PageSpec::new(2);
        let body = page_envelope(vec![json!({"id": 1}), json!({"id": 2})], None);
        assert_eq!(spec.parse_page(&body, 0).unwrap().next, NextPage::Done);
    }

    #[test]
    fn test_parse_page_rejects_bad_shapes() {
        let spec = PageSpec::new(10);
        assert!(matches!(
            spec.parse_page(&json!({"result": {}}), 0),
            Err(Error::Pagination(PaginationError::MissingElements(_)))
        ));
        assert!(spec.parse_page(&json!({"result": {"elements": [1]}}), 0).is_err());
        assert!(
            spec.parse_page(&json!({"result": {"elements": [], "nextPage": 5}}), 0)
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_walk_collects_all_pages_in_order() {
        let sizes = [100, 100, 37];
        let mut mock = MockTransport::new();
        let mut start = 0;
        for (i, size) in sizes.iter().enumerate() {
            let next = (i + 1 < sizes.len())
                .then(|| format!("{}?pageSize=100&skipToken=p{}", BASE, i + 1));
            mock = mock
                .with_envelope(page_envelope(contact_elements(start..start + size), next))
                .await;
            start += size;
        }

        let creds = credentials();
        let walker = PageWalker::new(&mock, &creds, PageSpec::new(100));
        let records = walker.walk(&first_url()).await.unwrap();

        assert_eq!(records.len(), 237);
        assert_eq!(records[0]["contactId"], json!("CID_000000000000000"));
        let ids: Vec<&str> = records.iter().map(|r| r["email"].as_str().unwrap()).collect();
        assert_eq!(ids[0], "contact0@example.com");
        assert_eq!(ids[236], "contact236@example.com");
        assert_eq!(mock.call_count().await, 3);

        let requests = mock.captured_requests().await;
        assert_eq!(requests[1].url, format!("{}?pageSize=100&skipToken=p1", BASE));
        assert!(requests.iter().all(|r| r.header_value("X-API-TOKEN") == Some("token")));
    }

    #[tokio::test]
    async fn test_single_page_makes_one_request() {
        let mock = MockTransport::new()
            .with_envelope(page_envelope(contact_elements(0..3), None))
            .await;

        let creds = credentials();
        let records = PageWalker::new(&mock, &creds, PageSpec::new(100))
            .walk(&first_url())
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(mock.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_page_aborts_and_discards() {
        let mock = MockTransport::new()
            .with_envelope(page_envelope(
                contact_elements(0..100),
                Some(format!("{}?cursor=abc", BASE)),
            ))
            .await
            .with_json(403, error_envelope("403 - Forbidden", "AUTH_403", "no access"))
            .await;

        let creds = credentials();
        let err = PageWalker::new(&mock, &creds, PageSpec::new(100))
            .walk(&first_url())
            .await
            .unwrap_err();

        match err {
            Error::Pagination(PaginationError::PageFailed {
                page,
                discarded,
                source,
            }) => {
                assert_eq!(page, 2);
                assert_eq!(discarded, 100);
                assert!(matches!(source, ApiError::Forbidden(_)));
            }
            other => panic!("expected PageFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_rejected() {
        let loop_url = format!("{}?cursor=same", BASE);
        let mock = MockTransport::new()
            .with_envelope(page_envelope(contact_elements(0..1), Some(loop_url.clone())))
            .await
            .with_envelope(page_envelope(contact_elements(1..2), Some(loop_url.clone())))
            .await;

        let creds = credentials();
        let err = PageWalker::new(&mock, &creds, PageSpec::new(100))
            .walk(&first_url())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Pagination(PaginationError::RepeatedCursor { page: 2, .. })
        ));
        assert_eq!(mock.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let mock = MockTransport::new()
            .with_envelope(page_envelope(contact_elements(0..1), Some(format!("{}?c=1", BASE))))
            .await
            .with_envelope(page_envelope(contact_elements(1..2), Some(format!("{}?c=2", BASE))))
            .await;

        let creds = credentials();
        let err = PageWalker::new(&mock, &creds, PageSpec::new(100))
            .max_pages(2)
            .walk(&first_url())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Pagination(PaginationError::PageLimitExceeded { max_pages: 2 })
        ));
    }

    #[tokio::test]
    async fn test_offset_fallback_walk() {
        let no_next = |range: std::ops::Range<usize>| {
            json!({
                "meta": {"httpStatus": "200 - OK"},
                "result": {"elements": contact_elements(range)}
            })
        };
        let mock = MockTransport::new()
            .with_envelope(no_next(0..2))
            .await
            .with_envelope(no_next(2..4))
            .await
            .with_envelope(no_next(4..5))
            .await;

        let creds = credentials();
        let first = PaginationParams::new().page_size(2).apply_to(BASE).unwrap();
        let records = PageWalker::new(&mock, &creds, PageSpec::new(2))
            .walk(&first)
            .await
            .unwrap();

        assert_eq!(records.len(), 5);
        let requests = mock.captured_requests().await;
        assert_eq!(requests.len(), 3);
        assert!(requests[1].url.ends_with("pageSize=2&offset=2"));
        assert!(requests[2].url.ends_with("pageSize=2&offset=4"));
    }

    #[tokio::test]
    async fn test_offset_fallback_full_last_page_costs_extra_request() {
        let no_next = |range: std::ops::Range<usize>| {
            json!({
                "meta": {"httpStatus": "200 - OK"},
                "result": {"elements": contact_elements(range)}
            })
        };
        let mock = MockTransport::new()
            .with_envelope(no_next(0..2))
            .await
            .with_envelope(no_next(2..4))
            .await
            .with_envelope(no_next(4..4))
            .await;

        let creds = credentials();
        let first = PaginationParams::new().page_size(2).apply_to(BASE).unwrap();
        let records = PageWalker::new(&mock, &creds, PageSpec::new(2))
            .walk(&first)
            .await
            .unwrap();

        assert_eq!(records.len(), 4);
        let requests = mock.captured_requests().await;
        assert_eq!(requests.len(), 3);
        assert!(requests[2].url.ends_with("pageSize=2&offset=4"));
        assert_eq!(mock.remaining().await, 0);
    }
}
