//! Text extraction from a loaded page.

use crate::browser::PageSession;
use crate::error::Result;

/// Pulls the inner text of the selector-identified region.
///
/// An absent region and an empty region both yield the empty string; only
/// transport-level failures propagate. "The selector never appeared" is a
/// separate, earlier failure raised by the selector wait.
pub async fn extract_text(session: &dyn PageSession, selector: &str) -> Result<String> {
    Ok(session.inner_text(selector).await?.unwrap_or_default())
}
