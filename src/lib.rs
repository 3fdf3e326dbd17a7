// Copyright 2026 Offprint Contributors
// SPDX-License-Identifier: Apache-2.0

//! Offprint presses a website into a stack of PDF documents.
//!
//! A run has two stages. The crawl stage walks links breadth-first from a
//! seed URL, bounded by a page ceiling and a URL glob, extracts a selected
//! region's text from every page, and stores one JSON record per page. The
//! render stage reads the records back and produces one A4 document per
//! record, with a running header and footer. The render stage can also run
//! alone against a previous run's records.

pub mod browser;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod store;

pub use config::{Cookie, CrawlConfig};
pub use error::{Error, Result};
pub use pipeline::{render_only, Pipeline, RunSummary, Stage};
