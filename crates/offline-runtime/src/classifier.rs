//! Request classification.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use http::Method;
use offline_core::{Destination, RequestDescriptor, RequestMode, RoutingClass, RuntimeConfig};
use url::Url;

/// Path prefixes that must never be cached or served from cache.
///
/// Matching is a plain prefix test, so `/admin` also covers `/admin/` and
/// `/admin.html`. The interception script's own path is always denied.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    prefixes: Vec<String>,
}

impl Denylist {
    /// Create an empty denylist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny a path prefix.
    pub fn deny(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.is_empty() && !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
        self
    }

    /// Whether `path` falls under a denied prefix.
    pub fn is_denied(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Denied prefixes in insertion order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Assigns every intercepted request exactly one routing class.
///
/// Total and free of I/O. The only state is the set of paths warmed into
/// the static partition, which install fills once.
#[derive(Debug)]
pub struct RequestClassifier {
    origin: Option<Url>,
    denylist: Denylist,
    data_endpoint: String,
    static_prefixes: Vec<String>,
    precached: RwLock<HashSet<String>>,
}

impl RequestClassifier {
    /// Build a classifier from runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let denylist = config
            .denylist
            .iter()
            .fold(Denylist::new(), |list, prefix| list.deny(prefix.clone()))
            .deny(config.script_path.clone());

        Self {
            origin: Url::parse(&config.origin).ok(),
            denylist,
            data_endpoint: config.data_endpoint.clone(),
            static_prefixes: config.static_prefixes.clone(),
            precached: RwLock::new(HashSet::new()),
        }
    }

    /// Treat these same-origin paths as static assets from now on.
    pub fn precache<I>(&self, paths: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut precached = self.precached.write().unwrap_or_else(PoisonError::into_inner);
        precached.extend(paths);
    }

    /// Whether install warmed `path` into the static partition.
    pub fn is_precached(&self, path: &str) -> bool {
        self.precached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    /// The denylist in effect.
    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Classify a request. First matching rule wins.
    pub fn classify(&self, request: &RequestDescriptor) -> RoutingClass {
        let path = request.path();

        if self.denylist.is_denied(path) {
            return RoutingClass::Bypass;
        }

        if request.method != Method::GET && request.method != Method::HEAD {
            return RoutingClass::Bypass;
        }

        if request.mode == RequestMode::Navigate || request.accepts_html() {
            return RoutingClass::Navigation;
        }

        if request.destination == Destination::Image {
            return RoutingClass::Image;
        }

        // Data and bundle prefixes only describe this origin's paths.
        if self.is_same_origin(&request.url) {
            if path == self.data_endpoint {
                return RoutingClass::DataEndpoint;
            }
            if self
                .static_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
                || self.is_precached(path)
            {
                return RoutingClass::StaticAsset;
            }
        }

        RoutingClass::Bypass
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        self.origin
            .as_ref()
            .map(|origin| origin.origin() == url.origin())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RequestClassifier {
        RequestClassifier::from_config(&RuntimeConfig::for_origin("https://shop.example"))
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).unwrap()
    }

    #[test]
    fn test_denylist_wins_over_navigation() {
        let request = get("https://shop.example/admin/products").with_mode(RequestMode::Navigate);
        assert_eq!(classifier().classify(&request), RoutingClass::Bypass);
    }

    #[test]
    fn test_script_path_always_denied() {
        let mut config = RuntimeConfig::for_origin("https://shop.example");
        config.denylist.clear();
        config.static_prefixes.push("/".to_string());
        let classifier = RequestClassifier::from_config(&config);
        assert_eq!(classifier.classify(&get("https://shop.example/sw.js")), RoutingClass::Bypass);
    }

    #[test]
    fn test_non_get_is_bypass() {
        let request = RequestDescriptor::new(Method::POST, "https://shop.example/assets/app.js").unwrap();
        assert_eq!(classifier().classify(&request), RoutingClass::Bypass);

        let head = RequestDescriptor::new(Method::HEAD, "https://shop.example/assets/app.js").unwrap();
        assert_eq!(classifier().classify(&head), RoutingClass::StaticAsset);
    }

    #[test]
    fn test_navigation_by_mode_or_accept() {
        let by_mode = get("https://shop.example/products").with_mode(RequestMode::Navigate);
        let by_accept = get("https://shop.example/products").with_header("accept", "text/html,*/*");
        assert_eq!(classifier().classify(&by_mode), RoutingClass::Navigation);
        assert_eq!(classifier().classify(&by_accept), RoutingClass::Navigation);
    }

    #[test]
    fn test_image_by_destination() {
        let request = get("https://cdn.example/p/1.webp").with_destination(Destination::Image);
        assert_eq!(classifier().classify(&request), RoutingClass::Image);
    }

    #[test]
    fn test_data_endpoint_ignores_query() {
        let request = get("https://shop.example/data/product_data.json?v=42");
        assert_eq!(classifier().classify(&request), RoutingClass::DataEndpoint);
    }

    #[test]
    fn test_static_prefixes() {
        for url in [
            "https://shop.example/assets/app.js",
            "https://shop.example/css/site.css",
            "https://shop.example/manifest.json",
        ] {
            assert_eq!(classifier().classify(&get(url)), RoutingClass::StaticAsset, "{url}");
        }
    }

    #[test]
    fn test_cross_origin_prefix_is_bypass() {
        assert_eq!(
            classifier().classify(&get("https://cdn.example/assets/app.js")),
            RoutingClass::Bypass
        );
    }

    #[test]
    fn test_precached_paths_are_static() {
        let classifier = classifier();
        let request = get("https://shop.example/a.js");
        assert_eq!(classifier.classify(&request), RoutingClass::Bypass);

        classifier.precache(["/a.js".to_string(), "/sw.js".to_string()]);
        assert_eq!(classifier.classify(&request), RoutingClass::StaticAsset);
        assert_eq!(classifier.classify(&get("https://shop.example/sw.js")), RoutingClass::Bypass);
        assert_eq!(classifier.classify(&get("https://cdn.example/a.js")), RoutingClass::Bypass);
    }

    #[test]
    fn test_default_is_bypass() {
        assert_eq!(classifier().classify(&get("https://shop.example/api/cart")), RoutingClass::Bypass);
    }
}
