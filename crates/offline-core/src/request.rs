//! Intercepted request descriptor.

use http::header::{HeaderName, HeaderValue, ACCEPT};
use http::{HeaderMap, Method};
use url::Url;

use crate::error::CoreError;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the browser issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    /// Same-origin subresource.
    SameOrigin,
    /// Cross-origin request with CORS.
    #[default]
    Cors,
    /// Opaque cross-origin request.
    NoCors,
}

impl RequestMode {
    /// Parse a mode string as the browser reports it (`navigate`, `cors`, ...).
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "navigate" => Self::Navigate,
            "same-origin" => Self::SameOrigin,
            "no-cors" => Self::NoCors,
            _ => Self::Cors,
        }
    }
}

/// What the requested resource will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Manifest,
    Font,
    /// Fetch/XHR from page scripts.
    #[default]
    Empty,
}

impl Destination {
    /// Parse a destination string (`image`, `script`, `""`, ...).
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "document" => Self::Document,
            "image" => Self::Image,
            "script" => Self::Script,
            "style" => Self::Style,
            "manifest" => Self::Manifest,
            "font" => Self::Font,
            _ => Self::Empty,
        }
    }
}

/// An intercepted request: `{url, method, headers, destination, mode}`.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Unique request identifier.
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL, query string included.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request destination.
    pub destination: Destination,
    /// Request mode.
    pub mode: RequestMode,
}

impl RequestDescriptor {
    /// Create a `GET` request for an absolute URL.
    pub fn get(url: &str) -> Result<Self, CoreError> {
        Self::new(Method::GET, url)
    }

    /// Create a request with an explicit method.
    pub fn new(method: Method, url: &str) -> Result<Self, CoreError> {
        let url = Url::parse(url).map_err(|e| CoreError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::from_url(method, url))
    }

    /// Create a request from an already parsed URL.
    pub fn from_url(method: Method, url: Url) -> Self {
        Self {
            id: RequestId::generate(),
            method,
            url,
            headers: HeaderMap::new(),
            destination: Destination::default(),
            mode: RequestMode::default(),
        }
    }

    /// Set the request mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the request destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the `Accept` header asks for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("text/html"))
    }
}
