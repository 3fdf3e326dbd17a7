//! Per-page extension point.

use async_trait::async_trait;

use crate::browser::PageSession;
use crate::error::Result;
use crate::store::PageRecord;

/// Write capability handed to visit hooks: append extra records to the
/// run's dataset without exposing the store itself.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn push(&self, record: PageRecord) -> Result<()>;
}

/// Caller-supplied per-page logic.
///
/// Invoked after the page's own record has been persisted and before link
/// discovery, with the live page session and a record sink. An error fails
/// that page only: its record stays, its links are not followed, and the
/// crawl moves on.
#[async_trait]
pub trait VisitHook: Send + Sync {
    async fn visit(&self, session: &mut dyn PageSession, sink: &dyn RecordSink) -> Result<()>;
}
