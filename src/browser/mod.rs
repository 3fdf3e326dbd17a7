//! Browser abstraction for page fetching.
//!
//! Defines the `PageFetcher` and `PageSession` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use async_trait::async_trait;

use crate::error::Result;

/// A browser engine that fetches pages for extraction.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Opens a fresh page session (tab). One session per crawled URL.
    async fn open_page(&self) -> Result<Box<dyn PageSession>>;

    /// Shuts the engine down.
    async fn shutdown(&self) -> Result<()>;
}

/// A single live page.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Sets a cookie scoped to `url`. Call before [`navigate`](Self::navigate).
    async fn set_cookie(&mut self, name: &str, value: &str, url: &str) -> Result<()>;

    /// Navigates to `url` and lets the load settle, up to `timeout_ms`.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;

    /// Resolves once `selector` matches at least one element, polling until
    /// `timeout_ms` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// The document title, empty when the page declares none.
    async fn title(&self) -> Result<String>;

    /// Inner text of the first element matching `selector`, or `None` when
    /// no element matches.
    async fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    /// Full serialized DOM of the current document.
    async fn html(&self) -> Result<String>;

    /// The document's final URL after redirects.
    async fn current_url(&self) -> Result<String>;

    /// Runs a JavaScript expression in the page and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Releases the underlying tab.
    async fn close(self: Box<Self>) -> Result<()>;
}
