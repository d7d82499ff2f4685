//! Synthetic responses served when no strategy step produced one.

use bytes::Bytes;
use http::StatusCode;
use offline_cache::LastResort;
use offline_core::{CapturedResponse, RuntimeConfig};

/// Body of the data endpoint's offline response.
pub const OFFLINE_JSON: &str = r#"{"error":"offline"}"#;

/// Pre-rendered last-resort responses of one runtime.
///
/// Built once from configuration so a failing request never has to decode
/// or format anything.
#[derive(Debug, Clone)]
pub struct FallbackResponses {
    offline_page: Bytes,
    placeholder_type: String,
    placeholder: Bytes,
}

impl FallbackResponses {
    /// Render fallbacks from configuration.
    ///
    /// An undecodable placeholder falls back to an empty body; `validate()`
    /// reports that case before a runtime is ever built.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let placeholder = config.placeholder_image.bytes().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "placeholder image not decodable");
            Vec::new()
        });
        Self {
            offline_page: Bytes::from(config.offline_page.clone()),
            placeholder_type: config.placeholder_image.content_type.clone(),
            placeholder: Bytes::from(placeholder),
        }
    }

    /// Response for a last-resort kind.
    pub fn render(&self, last_resort: LastResort) -> CapturedResponse {
        match last_resort {
            LastResort::GatewayTimeout => CapturedResponse::synthetic(
                StatusCode::GATEWAY_TIMEOUT,
                "text/plain; charset=utf-8",
                "Gateway Timeout",
            ),
            LastResort::OfflinePage => self.offline_page(),
            LastResort::OfflineJson => {
                CapturedResponse::synthetic(StatusCode::SERVICE_UNAVAILABLE, "application/json", OFFLINE_JSON)
            }
            LastResort::PlaceholderImage => self.placeholder(),
            LastResort::BadGateway => CapturedResponse::synthetic(
                StatusCode::BAD_GATEWAY,
                "text/plain; charset=utf-8",
                "Bad Gateway",
            ),
        }
    }

    /// The offline HTML page (status 200).
    pub fn offline_page(&self) -> CapturedResponse {
        CapturedResponse::synthetic(StatusCode::OK, "text/html; charset=utf-8", self.offline_page.clone())
            .with_header("cache-control", "no-store")
    }

    /// The bundled placeholder image (status 200).
    pub fn placeholder(&self) -> CapturedResponse {
        CapturedResponse::synthetic(StatusCode::OK, &self.placeholder_type, self.placeholder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::ResponseSource;

    fn fallbacks() -> FallbackResponses {
        FallbackResponses::from_config(&RuntimeConfig::default())
    }

    #[test]
    fn test_static_last_resort_is_504() {
        let response = fallbacks().render(LastResort::GatewayTimeout);
        assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.source, ResponseSource::Synthetic);
    }

    #[test]
    fn test_offline_json_body() {
        let response = fallbacks().render(LastResort::OfflineJson);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(&response.body[..], OFFLINE_JSON.as_bytes());
    }

    #[test]
    fn test_placeholder_is_decoded_gif() {
        let response = fallbacks().render(LastResort::PlaceholderImage);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("image/gif"));
        assert!(response.body.starts_with(b"GIF89a"));
    }

    #[test]
    fn test_offline_page_uses_configured_html() {
        let mut config = RuntimeConfig::default();
        config.offline_page = "<p>gone</p>".to_string();
        let response = FallbackResponses::from_config(&config).render(LastResort::OfflinePage);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"<p>gone</p>");
    }
}
