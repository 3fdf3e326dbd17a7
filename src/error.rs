//! Crate-wide error taxonomy.
//!
//! Failures fall into two groups. Contained failures (a selector that never
//! appears, a navigation that fails, a record that will not render) are
//! logged and skipped so the run keeps going. Everything else, such as bad
//! configuration, a browser that will not launch, or storage-level I/O, is
//! fatal and propagates to the caller.

use thiserror::Error;

/// Errors produced by the offprint library.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured selector never appeared on the page within its
    /// deadline. Contained: the page is skipped.
    #[error("selector '{selector}' did not appear on {url} within {timeout_ms}ms")]
    SelectorTimeout {
        selector: String,
        url: String,
        timeout_ms: u64,
    },

    /// Navigation or network failure for one page. Contained.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Document generation failed for one stored record. Contained within
    /// the render batch.
    #[error("failed to render record {id}: {message}")]
    Render { id: String, message: String },

    /// Invalid run configuration. Fatal, raised before any network activity.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Browser engine launch or protocol failure.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn browser(message: impl Into<String>) -> Self {
        Error::Browser(message.into())
    }

    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn render(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Render {
            id: id.into(),
            message: message.into(),
        }
    }

    /// True for failures scoped to a single page or record, which the crawl
    /// and render loops skip rather than abort on.
    pub fn is_contained(&self) -> bool {
        matches!(
            self,
            Error::SelectorTimeout { .. } | Error::Fetch { .. } | Error::Render { .. }
        )
    }

    /// Reclassifies an engine-level failure as a contained fetch failure
    /// for `url`. Storage and configuration errors pass through untouched,
    /// so they stay fatal.
    pub(crate) fn contain_for_page(self, url: &str) -> Error {
        match self {
            Error::Browser(message) => Error::Fetch {
                url: url.to_string(),
                message,
            },
            other => other,
        }
    }
}
