//! Capability boundary to the HTTP layer.
//!
//! The client only needs to issue a request, read a response body and know
//! whether the status is an error. Everything else (pooling, TLS, auth) lives
//! behind [`Transport`].

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_NDJSON: &str = "application/x-ndjson";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path relative to the endpoint, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub content_type: &'static str,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: CONTENT_TYPE_JSON,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self.content_type = CONTENT_TYPE_JSON;
        self
    }

    pub fn ndjson_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self.content_type = CONTENT_TYPE_NDJSON;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Path under an optional index: `/{index}/{endpoint}` or `/{endpoint}`.
pub fn index_path(index: &str, endpoint: &str) -> String {
    if index.is_empty() {
        format!("/{}", endpoint)
    } else {
        format!("/{}/{}", index, endpoint)
    }
}

/// A response body that has not been read yet. Dropping it returns the
/// underlying connection to its pool.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read the remaining body into memory. A second call yields nothing.
    async fn read_all(&mut self) -> Result<Vec<u8>>;
}

/// Body already held in memory.
#[derive(Debug, Default)]
pub struct BufferedBody(Option<Vec<u8>>);

impl BufferedBody {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Some(bytes))
    }
}

#[async_trait]
impl ResponseBody for BufferedBody {
    async fn read_all(&mut self) -> Result<Vec<u8>> {
        Ok(self.0.take().unwrap_or_default())
    }
}

pub struct Response {
    status: u16,
    pub(crate) body: Option<Box<dyn ResponseBody>>,
}

impl Response {
    pub fn new(status: u16, body: Option<Box<dyn ResponseBody>>) -> Self {
        Self { status, body }
    }

    pub fn buffered(status: u16, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(status, Some(Box::new(BufferedBody::new(bytes.into()))))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request. Only I/O failures are errors here; an error status
    /// is still a `Response`.
    async fn perform(&self, request: &Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn perform(&self, request: &Request) -> Result<Response> {
        (**self).perform(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path() {
        assert_eq!(index_path("tokens", "_bulk"), "/tokens/_bulk");
        assert_eq!(index_path("", "_search"), "/_search");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(Method::Post, "/logs/_bulk")
            .query("refresh", "false")
            .ndjson_body(b"{}\n".to_vec());
        assert_eq!(request.content_type, CONTENT_TYPE_NDJSON);
        assert_eq!(request.query_value("refresh"), Some("false"));
        assert_eq!(request.query_value("scroll"), None);
    }

    #[tokio::test]
    async fn test_buffered_body_reads_once() {
        let mut body = BufferedBody::new(b"abc".to_vec());
        assert_eq!(body.read_all().await.unwrap(), b"abc");
        assert!(body.read_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_error_statuses() {
        assert!(!Response::buffered(200, "").is_error());
        assert!(!Response::buffered(302, "").is_error());
        assert!(Response::buffered(404, "").is_error());
        assert!(Response::new(503, None).is_error());
    }
}
