//! HTML parsing: link extraction and visible-text extraction
//!
//! Link rules follow the usual crawler conventions: `<a href>` only,
//! relative hrefs resolved against the page URL, and non-navigational
//! schemes (`javascript:`, `mailto:`, `tel:`, `data:`) skipped. Text
//! extraction walks the DOM and collects text nodes outside of
//! script/style/noscript subtrees, one line per node.

use scraper::{Html, Selector};
use url::Url;

/// Tags whose text content is never page copy
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Extracted information from one HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Page title from `<title>`, if present and non-empty
    pub title: Option<String>,

    /// Visible text, newline-separated per text node
    pub text: String,

    /// Absolute out-links found on the page
    pub links: Vec<String>,
}

/// Parses HTML and extracts title, visible text, and links
pub fn parse_page(html: &str, base_url: &Url) -> Result<ParsedPage, String> {
    let document = Html::parse_document(html);

    Ok(ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url)?,
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects visible text nodes, skipping non-content subtrees
fn extract_text(document: &Html) -> String {
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let in_non_content = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| NON_CONTENT_TAGS.contains(&e.name()))
                .unwrap_or(false)
        });
        if in_non_content {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
    }

    out
}

fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<String>, String> {
    let selector =
        Selector::parse("a[href]").map_err(|e| format!("invalid link selector: {:?}", e))?;

    let mut links = Vec::new();
    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute) = resolve_link(href, base_url) {
                links.push(absolute);
            }
        }
    }

    Ok(links)
}

/// Resolves an href to an absolute HTTP(S) URL, or None if it should be
/// skipped (special schemes, fragments, unparseable values)
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if href.starts_with(scheme) {
            return None;
        }
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
