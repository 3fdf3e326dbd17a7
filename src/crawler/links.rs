//! Link harvesting and URL normalization.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Extracts candidate links from a rendered document.
///
/// Every `a[href]` is resolved against `base`, non-http(s) schemes are
/// dropped, fragments are stripped, and duplicates are removed while
/// preserving document order.
///
/// Note: `scraper`'s DOM types are not `Send`; callers on the async side
/// run this behind `spawn_blocking`.
pub fn harvest_links(html: &str, base: &Url) -> Vec<String> {
    let anchor = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchor) {
        let href = match element.value().attr("href") {
            Some(href) => href.trim(),
            None => continue,
        };
        let mut resolved = match base.join(href) {
            Ok(url) => url,
            Err(_) => continue,
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);
        let url = resolved.to_string();
        if seen.insert(url.clone()) {
            links.push(url);
        }
    }

    links
}

/// Normalizes a URL for visited-set comparison: absolute http(s) only,
/// fragment dropped.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn resolves_relative_hrefs_against_base() {
        let html = r#"<html><body>
            <a href="intro">intro</a>
            <a href="/docs/setup">setup</a>
            <a href="../faq">faq</a>
        </body></html>"#;
        let links = harvest_links(html, &base("https://example.com/docs/guide/"));
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/guide/intro",
                "https://example.com/docs/setup",
                "https://example.com/docs/faq",
            ]
        );
    }

    #[test]
    fn keeps_absolute_hrefs_as_is() {
        let html = r#"<a href="https://other.example/page">x</a>"#;
        let links = harvest_links(html, &base("https://example.com/"));
        assert_eq!(links, vec!["https://other.example/page"]);
    }

    #[test]
    fn drops_non_http_schemes() {
        let html = r#"
            <a href="mailto:team@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="https://example.com/keep">keep</a>
        "#;
        let links = harvest_links(html, &base("https://example.com/"));
        assert_eq!(links, vec!["https://example.com/keep"]);
    }

    #[test]
    fn strips_fragments_and_dedupes() {
        let html = r#"
            <a href="/page#top">a</a>
            <a href="/page#bottom">b</a>
            <a href="/page">c</a>
            <a href="/other">d</a>
        "#;
        let links = harvest_links(html, &base("https://example.com/"));
        assert_eq!(
            links,
            vec!["https://example.com/page", "https://example.com/other"]
        );
    }

    #[test]
    fn anchors_without_resolvable_href_are_skipped() {
        let html = r#"<a href="https://[bad">broken</a><a href="ok">fine</a>"#;
        let links = harvest_links(html, &base("https://example.com/dir/"));
        assert_eq!(links, vec!["https://example.com/dir/ok"]);
    }

    #[test]
    fn empty_document_yields_no_links() {
        assert!(harvest_links("", &base("https://example.com/")).is_empty());
        assert!(harvest_links("<p>no anchors</p>", &base("https://example.com/")).is_empty());
    }

    #[test]
    fn normalize_drops_fragment() {
        assert_eq!(
            normalize_url("https://example.com/docs#intro").as_deref(),
            Some("https://example.com/docs")
        );
    }

    #[test]
    fn normalize_rejects_non_http() {
        assert_eq!(normalize_url("mailto:x@example.com"), None);
        assert_eq!(normalize_url("not a url"), None);
    }

    #[test]
    fn glob_patterns_gate_urls_the_expected_way() {
        let pattern = glob::Pattern::new("https://example.com/docs/**").unwrap();
        assert!(pattern.matches("https://example.com/docs/intro"));
        assert!(pattern.matches("https://example.com/docs/guide/deep/page"));
        assert!(!pattern.matches("https://example.com/docsy/intro"));
        assert!(!pattern.matches("https://example.com/blog/post"));
        assert!(!pattern.matches("https://other.example/docs/intro"));
    }
}
