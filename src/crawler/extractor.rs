//! HTML extraction of links, email addresses and named entities
//!
//! Link extraction rules:
//!
//! **Include:**
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:`, `data:` and other non-HTTP schemes
//! - Fragment-only and empty hrefs
//!
//! `rel="nofollow"` links are followed.

use crate::url::{classify_link, normalize_link, LinkScope};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// Suffixes that turn an address-shaped token into an asset name
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

/// Links found on one page, normalized and split by domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    pub internal: Vec<Url>,
    pub external: Vec<Url>,
}

impl ExtractedLinks {
    /// Re-splits the links relative to another page
    ///
    /// Used when a redirect moved the content to a different host than the
    /// record it was fetched for.
    pub fn rescope(self, source: &Url) -> Self {
        let mut scoped = Self::default();
        for link in self.internal.into_iter().chain(self.external) {
            match classify_link(source, &link) {
                LinkScope::Internal => scoped.internal.push(link),
                LinkScope::External => scoped.external.push(link),
            }
        }
        scoped
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Organizations and people named on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub organizations: Vec<String>,
    pub persons: Vec<String>,
}

/// Pulls crawl results out of fetched content
///
/// Implementations are pure functions of their input.
pub trait Extractor: Send + Sync {
    /// Finds every followable link, resolved against `base`
    fn extract_links(&self, content: &str, base: &Url) -> Result<ExtractedLinks, ExtractError>;

    /// Finds email addresses, deduplicated and lowercased
    fn extract_emails(&self, content: &str) -> Vec<String>;

    /// Finds organization and person names
    fn extract_entities(&self, content: &str) -> Result<Entities, ExtractError>;
}

/// Extractor for HTML documents using `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn extract_links(&self, content: &str, base: &Url) -> Result<ExtractedLinks, ExtractError> {
        let document = Html::parse_document(content);
        let mut hrefs = Vec::new();

        for element in document.select(&selector("a[href]")?) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href);
            }
        }

        for element in document.select(&selector("link[rel='canonical'][href]")?) {
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href);
            }
        }

        let mut seen = HashSet::new();
        let mut links = ExtractedLinks::default();

        for href in hrefs {
            let url = match normalize_link(href, base) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Skipping link '{}': {}", href, e);
                    continue;
                }
            };

            if !seen.insert(url.to_string()) {
                continue;
            }

            match classify_link(base, &url) {
                LinkScope::Internal => links.internal.push(url),
                LinkScope::External => links.external.push(url),
            }
        }

        Ok(links)
    }

    fn extract_emails(&self, content: &str) -> Vec<String> {
        EMAIL_RE
            .find_iter(content)
            .map(|m| m.as_str().to_lowercase())
            .filter(|email| !ASSET_SUFFIXES.iter().any(|suffix| email.ends_with(suffix)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn extract_entities(&self, content: &str) -> Result<Entities, ExtractError> {
        let document = Html::parse_document(content);

        let organizations = collect_names(
            &document,
            &[
                ("meta[property='og:site_name'][content]", Some("content")),
                ("meta[name='application-name'][content]", Some("content")),
                ("[itemtype$='Organization'] [itemprop='name']", None),
            ],
        )?;

        let persons = collect_names(
            &document,
            &[
                ("meta[name='author'][content]", Some("content")),
                ("a[rel='author']", None),
                ("[itemtype$='Person'] [itemprop='name']", None),
            ],
        )?;

        Ok(Entities {
            organizations,
            persons,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Gathers trimmed, deduplicated names from an attribute or the element text
fn collect_names(
    document: &Html,
    sources: &[(&str, Option<&str>)],
) -> Result<Vec<String>, ExtractError> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for (css, attr) in sources {
        for element in document.select(&selector(css)?) {
            let raw = match attr {
                Some(attr) => element.value().attr(attr).unwrap_or_default().to_string(),
                None => element.text().collect::<String>(),
            };
            let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if !name.is_empty() && seen.insert(name.to_lowercase()) {
                names.push(name);
            }
        }
    }

    Ok(names)
}
