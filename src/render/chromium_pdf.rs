//! Chromium-backed PDF renderer.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;

use super::{
    document_html, footer_template, header_template, DocumentRenderer, A4_HEIGHT_IN, A4_WIDTH_IN,
    MARGIN_HORIZONTAL_IN, MARGIN_VERTICAL_IN,
};
use crate::browser::chromium::{close_browser, find_chromium, launch_browser};
use crate::error::{Error, Result};

/// Renders each document with a fresh headless Chromium instance.
///
/// One engine per record keeps a crashed print run from poisoning the
/// records that follow it.
pub struct ChromiumPdfRenderer {
    chrome: PathBuf,
}

impl ChromiumPdfRenderer {
    pub fn new() -> Result<Self> {
        let chrome = find_chromium().ok_or_else(|| {
            Error::browser("Chromium not found. Set OFFPRINT_CHROMIUM or install chromium.")
        })?;
        Ok(Self { chrome })
    }

    /// Uses a specific Chromium binary instead of the discovery chain.
    pub fn with_executable(chrome: PathBuf) -> Self {
        Self { chrome }
    }
}

#[async_trait]
impl DocumentRenderer for ChromiumPdfRenderer {
    async fn render(&self, title: &str, url: &str, text: &str) -> Result<Vec<u8>> {
        let (mut browser, handler) = launch_browser(self.chrome.clone()).await?;
        let result = print_document(&browser, title, url, text).await;
        close_browser(&mut browser, &handler).await;
        result
    }
}

async fn print_document(browser: &Browser, title: &str, url: &str, text: &str) -> Result<Vec<u8>> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| Error::browser(format!("failed to open render page: {e}")))?;
    page.set_content(document_html(text))
        .await
        .map_err(|e| Error::browser(format!("failed to load document: {e}")))?;

    let params = PrintToPdfParams {
        display_header_footer: Some(true),
        header_template: Some(header_template(title, url)),
        footer_template: Some(footer_template()),
        paper_width: Some(A4_WIDTH_IN),
        paper_height: Some(A4_HEIGHT_IN),
        margin_top: Some(MARGIN_VERTICAL_IN),
        margin_bottom: Some(MARGIN_VERTICAL_IN),
        margin_left: Some(MARGIN_HORIZONTAL_IN),
        margin_right: Some(MARGIN_HORIZONTAL_IN),
        ..PrintToPdfParams::default()
    };
    let bytes = page
        .pdf(params)
        .await
        .map_err(|e| Error::browser(format!("print failed: {e}")))?;
    let _ = page.close().await;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires Chromium to be installed.
    #[tokio::test]
    #[ignore]
    async fn prints_a_real_pdf() {
        let renderer = ChromiumPdfRenderer::new().unwrap();
        let bytes = renderer
            .render("Smoke", "https://example.com/", "hello from the press")
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
