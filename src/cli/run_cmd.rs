//! The `run` command: crawl a site, then press every record into a PDF.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::browser::chromium::ChromiumFetcher;
use crate::config::{Cookie, CrawlConfig};
use crate::pipeline::{Pipeline, RunSummary, Stage};
use crate::render::chromium_pdf::ChromiumPdfRenderer;

use super::output;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config_path: Option<&Path>,
    url: Option<&str>,
    match_pattern: Option<&str>,
    selector: Option<&str>,
    max_pages: Option<u32>,
    output_name: Option<&str>,
    cookie: Option<&str>,
    storage_dir: &Path,
    workers: Option<usize>,
) -> Result<()> {
    let config = build_config(
        config_path,
        url,
        match_pattern,
        selector,
        max_pages,
        output_name,
        cookie,
        workers,
    )
    .await?;

    // Configuration problems must surface before any engine launches.
    config.validate()?;

    let fetcher = Arc::new(ChromiumFetcher::new().await?);
    let renderer = Arc::new(ChromiumPdfRenderer::new()?);
    let pipeline = Pipeline::new(config, storage_dir, fetcher, renderer);

    let summary = pipeline.run(Stage::CrawlAndRender).await?;
    print_summary(&summary);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn build_config(
    config_path: Option<&Path>,
    url: Option<&str>,
    match_pattern: Option<&str>,
    selector: Option<&str>,
    max_pages: Option<u32>,
    output_name: Option<&str>,
    cookie: Option<&str>,
    workers: Option<usize>,
) -> Result<CrawlConfig> {
    let mut config = match config_path {
        Some(path) => CrawlConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let Some(url) = url else {
                bail!("either a config file or --url is required");
            };
            let Some(match_pattern) = match_pattern else {
                bail!("--match is required without a config file");
            };
            let Some(output_name) = output_name else {
                bail!("--output is required without a config file");
            };
            CrawlConfig::new(url, match_pattern, "body", 50, output_name)
        }
    };

    // Flags override the file.
    if let Some(url) = url {
        config.url = url.to_string();
    }
    if let Some(pattern) = match_pattern {
        config.match_pattern = pattern.to_string();
    }
    if let Some(selector) = selector {
        config.selector = selector.to_string();
    }
    if let Some(cap) = max_pages {
        config.max_pages_to_crawl = cap;
    }
    if let Some(name) = output_name {
        config.output_name = name.to_string();
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if let Some(raw) = cookie {
        config.cookie = Some(parse_cookie(raw)?);
    }
    Ok(config)
}

fn parse_cookie(raw: &str) -> Result<Cookie> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(Cookie {
            name: name.to_string(),
            value: value.to_string(),
        }),
        _ => bail!("cookie must be name=value, got '{raw}'"),
    }
}

pub(crate) fn print_summary(summary: &RunSummary) {
    if output::is_json() {
        output::print_json(summary);
        return;
    }
    if output::is_quiet() {
        return;
    }

    println!();
    println!("Run summary ({})", summary.stage);
    println!("===========");
    if summary.records.is_empty() {
        println!("(no records)");
    }
    for line in &summary.records {
        let mark = if line.rendered { "[OK]" } else { "[!!]" };
        println!("{mark} {}  {}  {}", line.id, line.title, line.url);
    }
    println!();
    if summary.stage == Stage::CrawlAndRender {
        println!("Pages crawled:      {}", summary.pages_crawled);
        println!("Pages skipped:      {}", summary.pages_skipped);
    }
    println!("Records stored:     {}", summary.records_stored);
    println!("Documents rendered: {}", summary.documents_rendered);
    if summary.documents_failed > 0 {
        println!("Documents failed:   {}", summary.documents_failed);
    }
}
