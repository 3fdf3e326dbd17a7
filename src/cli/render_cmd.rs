//! The `render` command: press a previous run's records without crawling.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::CrawlConfig;
use crate::pipeline;
use crate::render::chromium_pdf::ChromiumPdfRenderer;

use super::run_cmd::print_summary;

pub async fn run(
    config_path: Option<&Path>,
    output_name: Option<&str>,
    storage_dir: &Path,
) -> Result<()> {
    let name = match (output_name, config_path) {
        (Some(name), _) => name.to_string(),
        (None, Some(path)) => CrawlConfig::from_file(path).await?.output_name,
        (None, None) => bail!("either --output or a config file is required"),
    };

    let renderer = ChromiumPdfRenderer::new()?;
    let summary = pipeline::render_only(storage_dir, &name, &renderer).await?;
    print_summary(&summary);
    Ok(())
}
