//! Run configuration: what to crawl, what to extract, where it goes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_selector_timeout_ms() -> u64 {
    1_000
}

fn default_page_timeout_ms() -> u64 {
    15_000
}

fn default_workers() -> usize {
    2
}

/// A cookie injected before every navigation, scoped to the page being
/// fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Configuration for one crawl-and-press run.
///
/// Loaded once at startup and immutable after [`CrawlConfig::validate`]
/// passes. The JSON form uses camelCase keys:
///
/// ```json
/// {
///   "url": "https://example.com/docs/intro",
///   "match": "https://example.com/docs/**",
///   "selector": ".main",
///   "maxPagesToCrawl": 50,
///   "outputName": "docs"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    /// Seed URL the crawl starts from. Must be absolute http(s).
    pub url: String,

    /// Glob over absolute URLs. Discovered links must match it to be
    /// crawled; the seed itself is exempt.
    #[serde(rename = "match")]
    pub match_pattern: String,

    /// CSS selector for the region whose inner text becomes each record's
    /// body.
    pub selector: String,

    /// Hard ceiling on pages fetched. Zero fetches nothing.
    pub max_pages_to_crawl: u32,

    /// Dataset identifier. Names the record directory and the PDF directory.
    #[serde(alias = "outputFileName")]
    pub output_name: String,

    /// Optional cookie applied before each navigation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Cookie>,

    /// Deadline for the selector to appear on each page.
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,

    /// Navigation deadline per page.
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Concurrent fetch workers during the crawl stage.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl CrawlConfig {
    /// Builds a config with the stock timeouts and worker count.
    pub fn new(
        url: impl Into<String>,
        match_pattern: impl Into<String>,
        selector: impl Into<String>,
        max_pages_to_crawl: u32,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            match_pattern: match_pattern.into(),
            selector: selector.into(),
            max_pages_to_crawl,
            output_name: output_name.into(),
            cookie: None,
            selector_timeout_ms: default_selector_timeout_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            workers: default_workers(),
        }
    }

    /// Reads a JSON config file.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Checks every field that can fail, before the first network request.
    pub fn validate(&self) -> Result<()> {
        let seed = url::Url::parse(&self.url)
            .map_err(|e| Error::config(format!("seed URL '{}' is not valid: {e}", self.url)))?;
        if !matches!(seed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "seed URL '{}' must use http or https",
                self.url
            )));
        }

        if self.match_pattern.is_empty() {
            return Err(Error::config("match pattern must not be empty"));
        }
        glob::Pattern::new(&self.match_pattern).map_err(|e| {
            Error::config(format!(
                "match pattern '{}' is not a valid glob: {e}",
                self.match_pattern
            ))
        })?;

        scraper::Selector::parse(&self.selector).map_err(|e| {
            Error::config(format!(
                "selector '{}' is not a valid CSS selector: {e}",
                self.selector
            ))
        })?;

        validate_output_name(&self.output_name)
    }

    /// The compiled link filter. Call after [`validate`](Self::validate);
    /// an unvalidated pattern surfaces here as a configuration error.
    pub fn match_glob(&self) -> Result<glob::Pattern> {
        glob::Pattern::new(&self.match_pattern).map_err(|e| {
            Error::config(format!(
                "match pattern '{}' is not a valid glob: {e}",
                self.match_pattern
            ))
        })
    }
}

/// Output names become directory names, so they must be plain path
/// components.
pub fn validate_output_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("output name must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::config(format!(
            "output name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}
