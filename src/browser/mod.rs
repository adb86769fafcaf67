//! Browser automation surface
//!
//! The login flow and the signing oracle both drive a real browser page. The
//! [`BrowserSurface`] trait is the only view the rest of the crate has of it:
//! navigation, cookies in and out, a handful of DOM actions and script evaluation.

mod chromium;

pub use chromium::ChromiumSurface;

use crate::state::CookieJar;
use crate::CrawlerError;
use async_trait::async_trait;
use serde_json::Value;

/// A cookie to inject into the browser context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Capability exposed by a live browser page
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Loads `url` in the page
    async fn navigate(&self, url: &str) -> Result<(), CrawlerError>;

    /// Current cookies of the page's browser context
    async fn cookies(&self) -> Result<CookieJar, CrawlerError>;

    /// Injects a cookie into the browser context
    async fn add_cookie(&self, cookie: &CookieSpec) -> Result<(), CrawlerError>;

    /// Reads an attribute of the first element matching `selector`
    ///
    /// Returns `Ok(None)` when the element exists without the attribute.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, CrawlerError>;

    /// Types `value` into the element matching `selector`
    async fn fill(&self, selector: &str, value: &str) -> Result<(), CrawlerError>;

    /// Clicks the element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), CrawlerError>;

    /// Evaluates a script expression in the page and returns its JSON value
    async fn evaluate(&self, expression: &str) -> Result<Value, CrawlerError>;

    /// Reads a local-storage item of the page
    async fn local_storage_item(&self, key: &str) -> Result<Option<String>, CrawlerError> {
        let key_literal = serde_json::to_string(key)
            .map_err(|e| CrawlerError::Browser(format!("invalid storage key: {}", e)))?;
        let value = self
            .evaluate(&format!("window.localStorage.getItem({})", key_literal))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }
}
