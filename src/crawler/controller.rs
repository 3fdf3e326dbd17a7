//! Crawl controller: drives the fetch, extract, persist, enqueue cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::extract;
use super::frontier::Frontier;
use super::hook::{RecordSink, VisitHook};
use super::links;
use crate::browser::{PageFetcher, PageSession};
use crate::config::CrawlConfig;
use crate::error::{Error, Result};
use crate::store::{PageRecord, RecordStore};

/// Counters reported by a finished crawl stage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CrawlStats {
    /// Pages fetched, extracted, and recorded.
    pub pages_crawled: usize,
    /// Pages dropped by a contained failure.
    pub pages_skipped: usize,
    /// Links harvested from crawled pages, before filtering.
    pub links_discovered: usize,
    /// Links that matched the pattern and entered the frontier.
    pub links_enqueued: usize,
}

/// Breadth-first crawler over one site, bounded by the configured page
/// ceiling.
pub struct Crawler {
    config: CrawlConfig,
    pattern: Pattern,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RecordStore>,
    hook: Option<Arc<dyn VisitHook>>,
}

impl Crawler {
    pub fn new(
        config: CrawlConfig,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        let pattern = config.match_glob()?;
        Ok(Self {
            config,
            pattern,
            fetcher,
            store,
            hook: None,
        })
    }

    /// Installs a per-page visit hook.
    pub fn with_visit_hook(mut self, hook: Arc<dyn VisitHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Runs the crawl to completion: the seed enters the frontier, then
    /// workers claim pages until the frontier drains or the ceiling is
    /// reached. Per-page failures are contained; storage and engine-launch
    /// failures abort the stage.
    pub async fn run(&self) -> Result<CrawlStats> {
        let seed = links::normalize_url(&self.config.url).ok_or_else(|| {
            Error::config(format!("seed URL '{}' is not crawlable", self.config.url))
        })?;

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            pattern: self.pattern.clone(),
            fetcher: Arc::clone(&self.fetcher),
            store: Arc::clone(&self.store),
            hook: self.hook.clone(),
            frontier: Frontier::new(self.config.max_pages_to_crawl as usize),
            counters: Counters::default(),
        });

        // The seed bypasses the match pattern; with a zero ceiling the
        // frontier refuses it and the workers exit immediately.
        shared.frontier.offer(&seed);

        let workers = self.config.workers.max(1);
        info!(
            "crawl starting: seed {seed}, ceiling {}, {workers} worker(s)",
            self.config.max_pages_to_crawl
        );

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(worker_loop(worker, shared)));
        }

        let mut join_error: Option<Error> = None;
        for handle in handles {
            if let Err(e) = handle.await {
                shared.frontier.close();
                join_error.get_or_insert(Error::browser(format!("crawl worker panicked: {e}")));
            }
        }
        if let Some(e) = join_error {
            return Err(e);
        }
        if let Some(e) = shared.counters.take_fatal() {
            return Err(e);
        }

        let stats = CrawlStats {
            pages_crawled: shared.counters.crawled.load(Ordering::Relaxed),
            pages_skipped: shared.counters.skipped.load(Ordering::Relaxed),
            links_discovered: shared.counters.discovered.load(Ordering::Relaxed),
            links_enqueued: shared.counters.enqueued.load(Ordering::Relaxed),
        };
        info!(
            "crawl finished: {} crawled, {} skipped, {} link(s) enqueued",
            stats.pages_crawled, stats.pages_skipped, stats.links_enqueued
        );
        Ok(stats)
    }
}

struct Shared {
    config: CrawlConfig,
    pattern: Pattern,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RecordStore>,
    hook: Option<Arc<dyn VisitHook>>,
    frontier: Frontier,
    counters: Counters,
}

#[derive(Default)]
struct Counters {
    crawled: AtomicUsize,
    skipped: AtomicUsize,
    discovered: AtomicUsize,
    enqueued: AtomicUsize,
    fatal: Mutex<Option<Error>>,
}

impl Counters {
    fn record_fatal(&self, error: Error) {
        let mut fatal = self.fatal.lock().unwrap_or_else(|e| e.into_inner());
        fatal.get_or_insert(error);
    }

    fn take_fatal(&self) -> Option<Error> {
        self.fatal.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

async fn worker_loop(worker: usize, shared: Arc<Shared>) {
    while let Some(slot) = shared.frontier.claim().await {
        let url = slot.url().to_string();
        debug!(worker, "fetching {url}");
        match process_page(&shared, &url).await {
            Ok(outcome) => {
                shared.counters.crawled.fetch_add(1, Ordering::Relaxed);
                shared
                    .counters
                    .discovered
                    .fetch_add(outcome.discovered, Ordering::Relaxed);
                shared
                    .counters
                    .enqueued
                    .fetch_add(outcome.enqueued, Ordering::Relaxed);
            }
            Err(e) if e.is_contained() => {
                shared.counters.skipped.fetch_add(1, Ordering::Relaxed);
                warn!("skipping page: {e}");
            }
            Err(e) => {
                warn!("stopping crawl: {e}");
                shared.counters.record_fatal(e);
                shared.frontier.close();
            }
        }
        drop(slot);
    }
}

struct LinkOutcome {
    discovered: usize,
    enqueued: usize,
}

async fn process_page(shared: &Shared, url: &str) -> Result<LinkOutcome> {
    let mut session = shared.fetcher.open_page().await?;
    let result = drive_page(shared, session.as_mut(), url).await;
    if let Err(e) = session.close().await {
        debug!("page close failed: {e}");
    }
    result
}

async fn drive_page(
    shared: &Shared,
    session: &mut dyn PageSession,
    url: &str,
) -> Result<LinkOutcome> {
    let config = &shared.config;

    if let Some(cookie) = &config.cookie {
        session
            .set_cookie(&cookie.name, &cookie.value, url)
            .await
            .map_err(|e| e.contain_for_page(url))?;
    }

    session
        .navigate(url, config.page_timeout_ms)
        .await
        .map_err(|e| e.contain_for_page(url))?;
    session
        .wait_for_selector(&config.selector, config.selector_timeout_ms)
        .await
        .map_err(|e| e.contain_for_page(url))?;

    let title = session.title().await.map_err(|e| e.contain_for_page(url))?;
    let text = extract::extract_text(session, &config.selector)
        .await
        .map_err(|e| e.contain_for_page(url))?;
    let mut final_url = session.current_url().await.unwrap_or_default();
    if final_url.is_empty() {
        final_url = url.to_string();
    }

    // The record is durable before anything else happens for this page.
    let record = PageRecord {
        title,
        url: final_url.clone(),
        text,
    };
    let stored = shared.store.append(&record).await?;
    info!("crawled {url} -> record {}", stored.id);

    if let Some(hook) = &shared.hook {
        let sink = StoreSink {
            store: shared.store.as_ref(),
        };
        hook.visit(session, &sink)
            .await
            .map_err(|e| Error::fetch(url, format!("visit hook failed: {e}")))?;
    }

    let html = session.html().await.map_err(|e| e.contain_for_page(url))?;
    let base = Url::parse(&final_url).or_else(|_| Url::parse(url));
    let harvested = match base {
        Ok(base) => {
            // scraper's DOM is not Send; parse off the async workers
            tokio::task::spawn_blocking(move || links::harvest_links(&html, &base))
                .await
                .map_err(|e| Error::fetch(url, format!("link harvest failed: {e}")))?
        }
        Err(_) => Vec::new(),
    };

    let discovered = harvested.len();
    let mut enqueued = 0;
    for link in harvested {
        if shared.pattern.matches(&link) && shared.frontier.offer(&link) {
            enqueued += 1;
        }
    }
    if discovered > 0 {
        debug!("{url}: {discovered} link(s) found, {enqueued} enqueued");
    }

    Ok(LinkOutcome {
        discovered,
        enqueued,
    })
}

struct StoreSink<'a> {
    store: &'a dyn RecordStore,
}

#[async_trait]
impl RecordSink for StoreSink<'_> {
    async fn push(&self, record: PageRecord) -> Result<()> {
        self.store.append(&record).await.map(|_| ())
    }
}
