// Copyright 2026 Offprint Contributors
// SPDX-License-Identifier: Apache-2.0

//! Two-stage pipeline: crawl a site into records, then press the records
//! into PDF documents.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::PageFetcher;
use crate::config::{validate_output_name, CrawlConfig};
use crate::crawler::{CrawlStats, Crawler, VisitHook};
use crate::error::Result;
use crate::render::{render_all, DocumentRenderer, RenderStats};
use crate::store::{DatasetStore, RecordStore, StoredRecord};

/// Which stages a run executes. Crawling always hands off to rendering;
/// rendering can also run alone against a previous run's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    CrawlAndRender,
    RenderOnly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CrawlAndRender => write!(f, "crawl-and-render"),
            Stage::RenderOnly => write!(f, "render-only"),
        }
    }
}

/// What a finished run did, for the console summary and `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_crawled: usize,
    pub pages_skipped: usize,
    pub records_stored: usize,
    pub documents_rendered: usize,
    pub documents_failed: usize,
    pub records: Vec<RecordLine>,
}

/// One processed record in the final summary.
#[derive(Debug, Clone, Serialize)]
pub struct RecordLine {
    pub id: String,
    pub title: String,
    pub url: String,
    pub rendered: bool,
}

/// Orchestrates one run: crawl (unless skipped), bulk-read the dataset,
/// render, summarize.
pub struct Pipeline {
    config: CrawlConfig,
    storage_root: PathBuf,
    fetcher: Arc<dyn PageFetcher>,
    renderer: Arc<dyn DocumentRenderer>,
    hook: Option<Arc<dyn VisitHook>>,
}

impl Pipeline {
    pub fn new(
        config: CrawlConfig,
        storage_root: impl Into<PathBuf>,
        fetcher: Arc<dyn PageFetcher>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            config,
            storage_root: storage_root.into(),
            fetcher,
            renderer,
            hook: None,
        }
    }

    /// Installs a per-page visit hook for the crawl stage.
    pub fn with_visit_hook(mut self, hook: Arc<dyn VisitHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub async fn run(&self, stage: Stage) -> Result<RunSummary> {
        match stage {
            Stage::CrawlAndRender => self.crawl_and_render().await,
            Stage::RenderOnly => {
                render_only(
                    &self.storage_root,
                    &self.config.output_name,
                    self.renderer.as_ref(),
                )
                .await
            }
        }
    }

    async fn crawl_and_render(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        self.config.validate()?;

        let store: Arc<dyn RecordStore> =
            Arc::new(DatasetStore::open(&self.storage_root, &self.config.output_name).await?);

        let mut crawler = Crawler::new(
            self.config.clone(),
            Arc::clone(&self.fetcher),
            Arc::clone(&store),
        )?;
        if let Some(hook) = &self.hook {
            crawler = crawler.with_visit_hook(Arc::clone(hook));
        }

        // The engine comes down whether the crawl succeeded or not.
        let crawl = crawler.run().await;
        if let Err(e) = self.fetcher.shutdown().await {
            warn!("browser shutdown failed: {e}");
        }
        let crawl = crawl?;

        info!("stage transition: crawling -> rendering");

        let records = store.read_all().await?;
        let render = render_all(self.renderer.as_ref(), &records, &self.pdf_dir()).await?;

        Ok(summarize(
            Stage::CrawlAndRender,
            started_at,
            crawl,
            &records,
            &render,
        ))
    }

    fn pdf_dir(&self) -> PathBuf {
        self.storage_root.join("pdfs").join(&self.config.output_name)
    }
}

/// Renders a previous run's records without fetching anything. No browser
/// engine is launched for the crawl side.
pub async fn render_only(
    storage_root: &Path,
    output_name: &str,
    renderer: &dyn DocumentRenderer,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    validate_output_name(output_name)?;

    let store = DatasetStore::open(storage_root, output_name).await?;
    let records = store.read_all().await?;
    info!("rendering {} stored record(s)", records.len());

    let pdf_dir = storage_root.join("pdfs").join(output_name);
    let render = render_all(renderer, &records, &pdf_dir).await?;

    Ok(summarize(
        Stage::RenderOnly,
        started_at,
        CrawlStats::default(),
        &records,
        &render,
    ))
}

fn summarize(
    stage: Stage,
    started_at: DateTime<Utc>,
    crawl: CrawlStats,
    records: &[StoredRecord],
    render: &RenderStats,
) -> RunSummary {
    let lines: Vec<RecordLine> = records
        .iter()
        .map(|stored| RecordLine {
            id: stored.id.clone(),
            title: stored.record.title.clone(),
            url: stored.record.url.clone(),
            rendered: !render.failed.contains(&stored.id),
        })
        .collect();
    RunSummary {
        stage,
        started_at,
        finished_at: Utc::now(),
        pages_crawled: crawl.pages_crawled,
        pages_skipped: crawl.pages_skipped,
        records_stored: lines.len(),
        documents_rendered: render.rendered,
        documents_failed: render.failed.len(),
        records: lines,
    }
}
