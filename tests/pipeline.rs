//! End-to-end pipeline tests over an in-memory site.
//!
//! Exercises the crawl-then-render handoff against real storage:
//! - record files and PDFs land in the dataset layout
//! - per-page and per-record failures stay contained
//! - render-only runs press a previous run's records unchanged

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use offprint::browser::{PageFetcher, PageSession};
use offprint::config::CrawlConfig;
use offprint::crawler::{RecordSink, VisitHook};
use offprint::error::{Error, Result};
use offprint::pipeline::{render_only, Pipeline, Stage};
use offprint::render::DocumentRenderer;
use offprint::store::{DatasetStore, PageRecord, RecordStore};

// ── Fake site ──

#[derive(Clone, Default)]
struct FakePage {
    title: &'static str,
    /// `None` simulates a page where the selector never appears.
    text: Option<&'static str>,
    links: Vec<&'static str>,
}

fn page(title: &'static str, text: &'static str, links: &[&'static str]) -> FakePage {
    FakePage {
        title,
        text: Some(text),
        links: links.to_vec(),
    }
}

/// Five pages: the seed, three matching docs pages forming a diamond
/// (intro and setup both link to faq), and one off-pattern blog page.
fn docs_site() -> HashMap<&'static str, FakePage> {
    let mut site = HashMap::new();
    site.insert(
        "https://site.test/",
        page(
            "Welcome",
            "welcome to the docs",
            &[
                "https://site.test/docs/intro",
                "https://site.test/docs/setup",
                "https://site.test/blog/post",
            ],
        ),
    );
    site.insert(
        "https://site.test/docs/intro",
        page(
            "Intro",
            "getting started",
            &[
                "https://site.test/docs/setup",
                "https://site.test/docs/faq",
            ],
        ),
    );
    site.insert(
        "https://site.test/docs/setup",
        page(
            "Setup",
            "installation steps",
            &["https://site.test/docs/faq"],
        ),
    );
    site.insert("https://site.test/docs/faq", page("Faq", "answers", &[]));
    site.insert("https://site.test/blog/post", page("Blog", "off topic", &[]));
    site
}

const MESH: [&str; 10] = [
    "https://site.test/docs/p0",
    "https://site.test/docs/p1",
    "https://site.test/docs/p2",
    "https://site.test/docs/p3",
    "https://site.test/docs/p4",
    "https://site.test/docs/p5",
    "https://site.test/docs/p6",
    "https://site.test/docs/p7",
    "https://site.test/docs/p8",
    "https://site.test/docs/p9",
];

/// Ten docs pages that each link to every docs page, so parallel workers
/// keep rediscovering URLs that are already claimed or stored.
fn meshed_site() -> HashMap<&'static str, FakePage> {
    let mut site = HashMap::new();
    site.insert("https://site.test/", page("Hub", "hub text", &MESH));
    for url in MESH {
        site.insert(url, page("Doc", "mesh text", &MESH));
    }
    site
}

struct FakeFetcher {
    site: HashMap<&'static str, FakePage>,
    navigations: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    fn new(site: HashMap<&'static str, FakePage>) -> Arc<Self> {
        Arc::new(Self {
            site,
            navigations: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn open_page(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(FakeTab {
            site: self.site.clone(),
            navigations: Arc::clone(&self.navigations),
            at: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

struct FakeTab {
    site: HashMap<&'static str, FakePage>,
    navigations: Arc<Mutex<Vec<String>>>,
    at: Option<(String, FakePage)>,
}

impl FakeTab {
    fn loaded(&self) -> Result<&FakePage> {
        self.at
            .as_ref()
            .map(|(_, p)| p)
            .ok_or_else(|| Error::browser("no page loaded"))
    }
}

#[async_trait]
impl PageSession for FakeTab {
    async fn set_cookie(&mut self, _name: &str, _value: &str, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        let page = self
            .site
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "no route to host"))?;
        self.at = Some((url.to_string(), page));
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let (url, page) = self
            .at
            .as_ref()
            .ok_or_else(|| Error::browser("no page loaded"))?;
        if page.text.is_none() {
            return Err(Error::SelectorTimeout {
                selector: selector.to_string(),
                url: url.clone(),
                timeout_ms,
            });
        }
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.loaded()?.title.to_string())
    }

    async fn inner_text(&self, _selector: &str) -> Result<Option<String>> {
        Ok(self.loaded()?.text.map(String::from))
    }

    async fn html(&self) -> Result<String> {
        let anchors: String = self
            .loaded()?
            .links
            .iter()
            .map(|href| format!("<a href=\"{href}\">x</a>"))
            .collect();
        Ok(format!("<html><body>{anchors}</body></html>"))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.at.as_ref().map(|(u, _)| u.clone()).unwrap_or_default())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

// ── Fake renderer ──

/// Deterministic renderer: the "document" is the record's fields, so bytes
/// can be compared across runs.
#[derive(Default)]
struct StubRenderer {
    fail_titles: Vec<&'static str>,
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(&self, title: &str, url: &str, text: &str) -> Result<Vec<u8>> {
        if self.fail_titles.contains(&title) {
            return Err(Error::browser("print engine crashed"));
        }
        Ok(format!("%FAKE-PDF\n{title}\n{url}\n{text}\n").into_bytes())
    }
}

fn docs_config(cap: u32) -> CrawlConfig {
    let mut config = CrawlConfig::new(
        "https://site.test/",
        "https://site.test/docs/**",
        "main",
        cap,
        "docs",
    );
    config.workers = 1;
    config
}

// ── Crawl and render ──

#[tokio::test]
async fn crawl_then_render_produces_records_and_documents() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher::new(docs_site());
    let pipeline = Pipeline::new(
        docs_config(10),
        dir.path(),
        fetcher.clone(),
        Arc::new(StubRenderer::default()),
    );

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    assert_eq!(summary.stage, Stage::CrawlAndRender);
    assert_eq!(summary.pages_crawled, 4);
    assert_eq!(summary.pages_skipped, 0);
    assert_eq!(summary.records_stored, 4);
    assert_eq!(summary.documents_rendered, 4);
    assert_eq!(summary.documents_failed, 0);

    let dataset = dir.path().join("datasets/docs");
    let pdfs = dir.path().join("pdfs/docs");
    for id in ["000000001", "000000002", "000000003", "000000004"] {
        assert!(dataset.join(format!("{id}.json")).is_file());
        assert!(pdfs.join(format!("{id}.pdf")).is_file());
    }

    // The off-pattern blog page was never fetched.
    assert!(!fetcher
        .navigations()
        .contains(&"https://site.test/blog/post".to_string()));
}

#[tokio::test]
async fn a_cap_of_one_presses_exactly_one_document() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher::new(docs_site());
    let pipeline = Pipeline::new(
        docs_config(1),
        dir.path(),
        fetcher.clone(),
        Arc::new(StubRenderer::default()),
    );

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    assert_eq!(fetcher.navigations().len(), 1);
    assert_eq!(summary.records_stored, 1);
    assert_eq!(summary.documents_rendered, 1);
    assert!(dir.path().join("pdfs/docs/000000001.pdf").is_file());
    assert!(!dir.path().join("datasets/docs/000000002.json").exists());
}

#[tokio::test]
async fn shared_links_are_fetched_exactly_once() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher::new(docs_site());
    let pipeline = Pipeline::new(
        docs_config(10),
        dir.path(),
        fetcher.clone(),
        Arc::new(StubRenderer::default()),
    );

    pipeline.run(Stage::CrawlAndRender).await.unwrap();

    // Both intro and setup link to faq; it must be fetched once.
    let navigations = fetcher.navigations();
    let faq_fetches = navigations
        .iter()
        .filter(|url| url.as_str() == "https://site.test/docs/faq")
        .count();
    assert_eq!(faq_fetches, 1);
    assert_eq!(navigations.len(), 4);
}

#[tokio::test]
async fn parallel_workers_hold_the_cap_and_fetch_each_url_once() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher::new(meshed_site());
    let mut config = docs_config(7);
    config.workers = 4;
    let pipeline = Pipeline::new(
        config,
        dir.path(),
        fetcher.clone(),
        Arc::new(StubRenderer::default()),
    );

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    // The ceiling bounds started fetches, so exactly seven navigations
    // happen and none repeats, however the workers interleave.
    let navigations = fetcher.navigations();
    assert_eq!(navigations.len(), 7);
    let distinct: HashSet<&String> = navigations.iter().collect();
    assert_eq!(distinct.len(), 7);

    assert_eq!(summary.pages_crawled, 7);
    assert_eq!(summary.records_stored, 7);
    assert_eq!(summary.documents_rendered, 7);
    assert_eq!(summary.documents_failed, 0);
}

#[tokio::test]
async fn selector_timeouts_are_excluded_from_the_summary() {
    let mut site = docs_site();
    site.insert(
        "https://site.test/docs/intro",
        FakePage {
            title: "Intro",
            text: None,
            links: vec![],
        },
    );

    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        docs_config(10),
        dir.path(),
        FakeFetcher::new(site),
        Arc::new(StubRenderer::default()),
    );

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    assert_eq!(summary.pages_skipped, 1);
    let titles: Vec<&str> = summary.records.iter().map(|r| r.title.as_str()).collect();
    assert!(!titles.contains(&"Intro"));
    assert_eq!(summary.records_stored, summary.documents_rendered);
}

#[tokio::test]
async fn zero_cap_renders_only_preexisting_records() {
    let dir = TempDir::new().unwrap();

    // A previous run's record.
    let store = DatasetStore::open(dir.path(), "docs").await.unwrap();
    store
        .append(&PageRecord {
            title: "Old".to_string(),
            url: "https://site.test/docs/old".to_string(),
            text: "kept".to_string(),
        })
        .await
        .unwrap();
    drop(store);

    let fetcher = FakeFetcher::new(docs_site());
    let pipeline = Pipeline::new(
        docs_config(0),
        dir.path(),
        fetcher.clone(),
        Arc::new(StubRenderer::default()),
    );

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    assert!(fetcher.navigations().is_empty());
    assert_eq!(summary.pages_crawled, 0);
    assert_eq!(summary.records_stored, 1);
    assert_eq!(summary.documents_rendered, 1);
    assert!(dir.path().join("pdfs/docs/000000001.pdf").is_file());
}

#[tokio::test]
async fn a_second_run_extends_the_dataset_sequence() {
    let dir = TempDir::new().unwrap();

    for _ in 0..2 {
        let pipeline = Pipeline::new(
            docs_config(1),
            dir.path(),
            FakeFetcher::new(docs_site()),
            Arc::new(StubRenderer::default()),
        );
        pipeline.run(Stage::CrawlAndRender).await.unwrap();
    }

    let store = DatasetStore::open(dir.path(), "docs").await.unwrap();
    let records = store.read_all().await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["000000001", "000000002"]);
    assert!(dir.path().join("pdfs/docs/000000002.pdf").is_file());
}

#[tokio::test]
async fn record_text_survives_the_disk_round_trip() {
    let mut site = HashMap::new();
    site.insert(
        "https://site.test/",
        page("Łódź näive ✓", "tabs\tand\nnewlines survive", &[]),
    );

    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        docs_config(1),
        dir.path(),
        FakeFetcher::new(site),
        Arc::new(StubRenderer::default()),
    );
    pipeline.run(Stage::CrawlAndRender).await.unwrap();

    let store = DatasetStore::open(dir.path(), "docs").await.unwrap();
    let records = store.read_all().await.unwrap();
    assert_eq!(
        records[0].record,
        PageRecord {
            title: "Łódź näive ✓".to_string(),
            url: "https://site.test/".to_string(),
            text: "tabs\tand\nnewlines survive".to_string(),
        }
    );
}

// ── Visit hooks ──

struct NotesHook;

#[async_trait]
impl VisitHook for NotesHook {
    async fn visit(&self, session: &mut dyn PageSession, sink: &dyn RecordSink) -> Result<()> {
        let title = session.title().await?;
        sink.push(PageRecord {
            title: format!("{title} (notes)"),
            url: session.current_url().await?,
            text: "margin notes".to_string(),
        })
        .await
    }
}

#[tokio::test]
async fn visit_hooks_write_alongside_page_records() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        docs_config(1),
        dir.path(),
        FakeFetcher::new(docs_site()),
        Arc::new(StubRenderer::default()),
    )
    .with_visit_hook(Arc::new(NotesHook));

    let summary = pipeline.run(Stage::CrawlAndRender).await.unwrap();

    let titles: Vec<&str> = summary.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Welcome", "Welcome (notes)"]);
    assert_eq!(summary.documents_rendered, 2);
}

// ── Render only ──

#[tokio::test]
async fn render_only_reruns_are_byte_identical() {
    let dir = TempDir::new().unwrap();
    let store = DatasetStore::open(dir.path(), "docs").await.unwrap();
    for (title, text) in [("One", "first"), ("Two", "second")] {
        store
            .append(&PageRecord {
                title: title.to_string(),
                url: format!("https://site.test/docs/{title}"),
                text: text.to_string(),
            })
            .await
            .unwrap();
    }

    let renderer = StubRenderer::default();
    let first = render_only(dir.path(), "docs", &renderer).await.unwrap();
    assert_eq!(first.stage, Stage::RenderOnly);
    assert_eq!(first.pages_crawled, 0);
    assert_eq!(first.documents_rendered, 2);
    let before = std::fs::read(dir.path().join("pdfs/docs/000000001.pdf")).unwrap();

    let second = render_only(dir.path(), "docs", &renderer).await.unwrap();
    assert_eq!(second.documents_rendered, 2);
    let after = std::fs::read(dir.path().join("pdfs/docs/000000001.pdf")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn a_failing_document_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let store = DatasetStore::open(dir.path(), "docs").await.unwrap();
    for title in ["One", "Two", "Three"] {
        store
            .append(&PageRecord {
                title: title.to_string(),
                url: format!("https://site.test/docs/{title}"),
                text: "text".to_string(),
            })
            .await
            .unwrap();
    }

    let renderer = StubRenderer {
        fail_titles: vec!["Two"],
    };
    let summary = render_only(dir.path(), "docs", &renderer).await.unwrap();

    assert_eq!(summary.documents_rendered, 2);
    assert_eq!(summary.documents_failed, 1);
    assert!(summary.records[0].rendered);
    assert!(!summary.records[1].rendered);
    assert!(summary.records[2].rendered);

    let pdfs = dir.path().join("pdfs/docs");
    assert!(pdfs.join("000000001.pdf").is_file());
    assert!(!pdfs.join("000000002.pdf").exists());
    assert!(pdfs.join("000000003.pdf").is_file());
}
