//! Chromium-based page fetching via chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{PageFetcher, PageSession};
use crate::error::{Error, Result};

const SELECTOR_POLL_INTERVAL_MS: u64 = 50;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. OFFPRINT_CHROMIUM env
    if let Ok(p) = std::env::var("OFFPRINT_CHROMIUM") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.offprint/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".offprint/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".offprint/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".offprint/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".offprint/chromium/chrome-linux64/chrome"),
                home.join(".offprint/chromium/chrome"),
            ]
        };
        for candidate in candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    // 3. System PATH
    for name in [
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches headless Chromium with the crate's standard flags and spawns
/// its CDP event loop.
pub(crate) async fn launch_browser(chrome: PathBuf) -> Result<(Browser, JoinHandle<()>)> {
    let config = BrowserConfig::builder()
        .chrome_executable(chrome)
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .build()
        .map_err(|e| Error::browser(format!("failed to build browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| Error::browser(format!("failed to launch Chromium: {e}")))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let _ = event;
        }
    });

    Ok((browser, handle))
}

/// Closes the engine and reaps the child process, then stops the event
/// loop task.
pub(crate) async fn close_browser(browser: &mut Browser, handler: &JoinHandle<()>) {
    let _ = browser.close().await;
    let _ = browser.wait().await;
    handler.abort();
}

/// Serializes a string as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn element_exists_js(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

fn inner_text_js(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return el === null ? null : el.innerText; }})()",
        js_string(selector)
    )
}

/// Chromium-backed fetcher: one engine for the whole crawl, one tab per
/// page.
pub struct ChromiumFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumFetcher {
    /// Launches a headless Chromium instance.
    pub async fn new() -> Result<Self> {
        let chrome = find_chromium().ok_or_else(|| {
            Error::browser("Chromium not found. Set OFFPRINT_CHROMIUM or install chromium.")
        })?;
        let (browser, handler) = launch_browser(chrome).await?;
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn open_page(&self) -> Result<Box<dyn PageSession>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| Error::browser(format!("failed to open page: {e}")))?;
        Ok(Box::new(ChromiumSession { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        close_browser(&mut browser, &self.handler).await;
        Ok(())
    }
}

/// A single Chromium tab.
pub struct ChromiumSession {
    page: Page,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn set_cookie(&mut self, name: &str, value: &str, url: &str) -> Result<()> {
        let cookie = CookieParam::builder()
            .name(name)
            .value(value)
            .url(url)
            .build()
            .map_err(Error::browser)?;
        self.page
            .set_cookies(vec![cookie])
            .await
            .map_err(|e| Error::browser(format!("failed to set cookie: {e}")))?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()> {
        let timeout = Duration::from_millis(timeout_ms);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                // goto resolves on the navigation response; let the load
                // event settle before callers start querying the DOM
                let _ = tokio::time::timeout(timeout, self.page.wait_for_navigation()).await;
                Ok(())
            }
            Ok(Err(e)) => Err(Error::fetch(url, format!("navigation failed: {e}"))),
            Err(_) => Err(Error::fetch(
                url,
                format!("navigation timed out after {timeout_ms}ms"),
            )),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let script = element_exists_js(selector);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.evaluate(&script).await?.as_bool() == Some(true) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                let url = self.current_url().await.unwrap_or_default();
                return Err(Error::SelectorTimeout {
                    selector: selector.to_string(),
                    url,
                    timeout_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(SELECTOR_POLL_INTERVAL_MS)).await;
        }
    }

    async fn title(&self) -> Result<String> {
        let value = self.evaluate("document.title").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let value = self.evaluate(&inner_text_js(selector)).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn html(&self) -> Result<String> {
        let value = self.evaluate("document.documentElement.outerHTML").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| Error::browser(format!("failed to read page URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Error::browser(format!("script evaluation failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| Error::browser(format!("script result not convertible: {e:?}")))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
