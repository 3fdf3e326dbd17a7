//! Crawl stage: a bounded breadth-first walk over one site.
//!
//! The [`Frontier`] hands URLs to fetch workers, each worker drives a
//! [`PageSession`](crate::browser::PageSession) through navigate, wait,
//! extract, persist, and link discovery, and the [`Crawler`] ties the
//! pieces together.

pub mod controller;
pub mod extract;
pub mod frontier;
pub mod hook;
pub mod links;

pub use controller::{CrawlStats, Crawler};
pub use frontier::Frontier;
pub use hook::{RecordSink, VisitHook};
