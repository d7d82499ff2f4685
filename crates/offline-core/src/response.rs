//! Captured HTTP responses.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    /// Straight from the network.
    Network,
    /// Served from the named cache partition.
    Cache(String),
    /// Produced by the runtime itself (offline page, placeholder, 504).
    Synthetic,
}

/// A fully buffered response: status, headers and body.
///
/// The body is buffered before a response is ever written to a partition,
/// so an aborted request can never leave a partial entry behind.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
    /// Origin of this response.
    pub source: ResponseSource,
}

impl CapturedResponse {
    /// Create a network response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    /// Create a `200 OK` network response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Create a runtime-generated response.
    pub fn synthetic(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::new(status, body)
            .with_header(CONTENT_TYPE.as_str(), content_type)
            .with_source(ResponseSource::Synthetic)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Insert or replace a header. Invalid names or values are ignored.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Set the response source.
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// Get a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// A structurally independent copy suitable for writing to a partition.
    ///
    /// The copy always carries `ResponseSource::Network`; the partition it is
    /// read back from decides its source on the way out.
    pub fn cache_copy(&self) -> Self {
        Self {
            status: self.status,
            headers: self.headers.clone(),
            body: Bytes::copy_from_slice(&self.body),
            source: ResponseSource::Network,
        }
    }
}
