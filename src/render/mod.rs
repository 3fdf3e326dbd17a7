//! Render stage: presses stored records into paginated PDF documents.

pub mod chromium_pdf;

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::StoredRecord;

/// A4 paper, in inches.
pub const A4_WIDTH_IN: f64 = 8.27;
pub const A4_HEIGHT_IN: f64 = 11.7;

/// Print margins, in inches. Chromium resolves pixel margins at 96 dpi, so
/// these correspond to 50px vertically and 20px horizontally.
pub const MARGIN_VERTICAL_IN: f64 = 50.0 / 96.0;
pub const MARGIN_HORIZONTAL_IN: f64 = 20.0 / 96.0;

/// Turns one record into a paginated PDF document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, title: &str, url: &str, text: &str) -> Result<Vec<u8>>;
}

/// Counters reported by a finished render stage.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub rendered: usize,
    /// Ids of records whose document failed, in read order.
    pub failed: Vec<String>,
}

/// Renders every record into `out_dir`, one PDF per record, named by the
/// record's storage id with a `.pdf` extension.
///
/// Strictly sequential. A failing record is logged and skipped; documents
/// already written stay untouched. The directory is created on first use,
/// so an empty record set leaves no trace.
pub async fn render_all(
    renderer: &dyn DocumentRenderer,
    records: &[StoredRecord],
    out_dir: &Path,
) -> Result<RenderStats> {
    let mut stats = RenderStats::default();
    if records.is_empty() {
        return Ok(stats);
    }

    tokio::fs::create_dir_all(out_dir).await?;

    for stored in records {
        let record = &stored.record;
        match renderer
            .render(&record.title, &record.url, &record.text)
            .await
        {
            Ok(bytes) => {
                let path = out_dir.join(format!("{}.pdf", stored.id));
                tokio::fs::write(&path, &bytes).await?;
                info!("rendered {} -> {}", stored.id, path.display());
                stats.rendered += 1;
            }
            Err(e) => {
                let e = Error::render(&stored.id, e.to_string());
                warn!("skipping document: {e}");
                stats.failed.push(stored.id.clone());
            }
        }
    }
    Ok(stats)
}

/// Escapes text for literal inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// The printable document body: the record's text preformatted and wrapped,
/// with room reserved under the running header.
pub fn document_html(text: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>\
         <div style=\"margin-top: 60px;\">\
         <pre style=\"white-space: pre-wrap; word-wrap: break-word; font-family: sans-serif;\">{}</pre>\
         </div></body></html>",
        escape_html(text)
    )
}

/// Running header shown on every page: "{title} - {url}".
pub fn header_template(title: &str, url: &str) -> String {
    format!(
        "<div style=\"font-size: 10px; text-align: center; width: 100%;\">{} - {}</div>",
        escape_html(title),
        escape_html(url)
    )
}

/// Running footer shown on every page; the print engine fills the spans in.
pub fn footer_template() -> String {
    "<div style=\"font-size: 10px; text-align: center; width: 100%;\">\
     Page <span class=\"pageNumber\"></span> of <span class=\"totalPages\"></span>\
     </div>"
        .to_string()
}
