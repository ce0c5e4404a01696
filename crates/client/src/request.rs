//! Request descriptors and category classification.
//!
//! Every intercepted request is classified into exactly one category, which
//! picks the caching strategy the gateway applies:
//!
//! - `StaticAsset` — path extension in the static set → cache first
//! - `Navigation` — document loads → network first
//! - `Other` — everything else → stale-while-revalidate

use arkalia_core::cache::key::compute_cache_key;
use reqwest::Method;
use url::Url;

/// File extensions treated as static assets.
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "svg", "png", "jpg", "jpeg", "webp", "ico", "woff", "woff2"];

/// Strategy category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    StaticAsset,
    Navigation,
    Other,
}

/// An intercepted request descriptor.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Value of the Accept header, if the caller sent one.
    pub accept: Option<String>,
    /// True when the request loads a document for display (navigate mode).
    pub navigate: bool,
}

impl Request {
    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, accept: None, navigate: false }
    }

    /// A navigation (document load) request.
    pub fn navigation(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            accept: Some("text/html,application/xhtml+xml".to_string()),
            navigate: true,
        }
    }

    /// Cache key for this request (method + URL).
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }

    /// Classify the request into its strategy category.
    pub fn classify(&self) -> RequestClass {
        if self.is_static_asset() {
            RequestClass::StaticAsset
        } else if self.is_navigation() {
            RequestClass::Navigation
        } else {
            RequestClass::Other
        }
    }

    fn is_static_asset(&self) -> bool {
        let path = self.url.path();
        match path.rsplit_once('.') {
            Some((_, ext)) => STATIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
            None => false,
        }
    }

    fn is_navigation(&self) -> bool {
        self.navigate
            || (self.method == Method::GET
                && self.accept.as_deref().is_some_and(|a| a.contains("text/html")))
    }
}
