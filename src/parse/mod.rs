//! HTML document parsing
//!
//! The HTML collaborator for the fetch/crawl core: parse a response body,
//! capture the page title, and extract absolute outbound links resolved
//! against the page URL. The parsed [`Document`] is an owned snapshot
//! (title, links, source HTML), so it can cross task boundaries.

use crate::{DriftError, Result};
use scraper::{Html, Selector};
use url::Url;

/// Parsed snapshot of one HTML page
#[derive(Debug, Clone)]
pub struct Document {
    /// The page title (from the <title> tag), if present and non-empty
    pub title: Option<String>,

    /// Absolute outbound links, in document order
    pub links: Vec<Url>,

    /// The raw HTML the snapshot was parsed from
    pub html: String,
}

impl Document {
    /// Runs a CSS selector over the source HTML and returns the trimmed
    /// text of each match. Convenience for downstream extraction.
    pub fn select_text(&self, selector: &str) -> Result<Vec<String>> {
        let selector = Selector::parse(selector).map_err(|e| DriftError::Decode {
            url: String::new(),
            message: format!("invalid selector: {}", e),
        })?;

        let html = Html::parse_document(&self.html);
        Ok(html
            .select(&selector)
            .map(|element| element.text().collect::<String>().trim().to_string())
            .collect())
    }
}

/// Parses HTML content into a [`Document`]
///
/// Link extraction covers `<a href>` tags, resolved against `base_url`.
/// Excluded: `javascript:`, `mailto:`, `tel:` and `data:` schemes,
/// fragment-only anchors, `download` links, and anything that does not
/// resolve to an http(s) URL.
pub fn parse_document(html: &str, base_url: &Url) -> Document {
    let parsed = Html::parse_document(html);

    Document {
        title: extract_title(&parsed),
        links: extract_links(&parsed, base_url),
        html: html.to_string(),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and filters out non-followable
/// targets.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
