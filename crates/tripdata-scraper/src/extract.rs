//! Pulls matching download links out of the rendered index page.
//!
//! Matching is a case-sensitive substring test on the raw `href` value. The
//! value is not trimmed, decoded or resolved against the page URL, and the
//! result keeps document order and duplicates.

use scraper::{Html, Selector};
use std::fmt;
use std::sync::OnceLock;

/// A hyperlink target taken verbatim from the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link(String);

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything after the last `/`.
    ///
    /// Query strings are kept and two links sharing a trailing segment map to
    /// the same name; callers treat the second one as already downloaded.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Link {
    fn from(href: &str) -> Self {
        Self::new(href)
    }
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

/// Return every anchor `href` that contains `pattern`, in document order.
pub fn extract_links(html: &str, pattern: &str) -> Vec<Link> {
    let document = Html::parse_document(html);

    document
        .select(anchor_selector())
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty() && href.contains(pattern))
        .map(Link::new)
        .collect()
}
