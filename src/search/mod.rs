//! Search-page detection, query extraction, and auto-keyword derivation
//!
//! Known engines are matched by exact host or subdomain with their specific
//! query parameter; anything else falls back to a list of common parameter
//! names. Query words become auto-derived slots with palette colors so a
//! search's terms stay highlighted on the result page and every page visited
//! from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::dom::PageModel;
use crate::engine::color::palette_color;
use crate::engine::matcher::KeywordSlot;

// =============================================================================
// Types
// =============================================================================

/// Known search engines and the parameter carrying their query
const SEARCH_ENGINES: &[(&str, &str)] = &[
    ("www.google.com", "q"),
    ("www.google.co.jp", "q"),
    ("www.bing.com", "q"),
    ("search.yahoo.com", "p"),
    ("search.yahoo.co.jp", "p"),
    ("duckduckgo.com", "q"),
    ("www.baidu.com", "wd"),
];

/// Fallback parameter names checked on unknown hosts
const GENERIC_QUERY_PARAMS: &[&str] = &["q", "query", "search", "keyword", "s"];

/// Hostname fragments that mark a page as a search results page
const SEARCH_HOST_HINTS: &[&str] = &["google.", "bing.", "yahoo.", "duckduckgo.", "search."];

/// Auto-derived slots are capped at this many words
pub const MAX_AUTO_KEYWORDS: usize = 8;

/// What `getPageInfo` reports about the current page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub query: String,
    pub title: String,
    pub url: String,
}

// =============================================================================
// Query extraction
// =============================================================================

/// Pull the search query out of a page URL. Known engines are checked first
/// with their own parameter, then the generic fallbacks. Invalid URLs and
/// empty parameters yield None.
pub fn extract_search_query(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    for (engine_host, param) in SEARCH_ENGINES {
        if host == *engine_host || host.ends_with(&format!(".{}", engine_host)) {
            if let Some(query) = query_param(&parsed, param) {
                return Some(query);
            }
        }
    }

    for param in GENERIC_QUERY_PARAMS {
        if let Some(query) = query_param(&parsed, param) {
            return Some(query);
        }
    }
    None
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Hostname heuristic for "is this a search results page"
pub fn is_search_host(host: &str) -> bool {
    SEARCH_HOST_HINTS.iter().any(|hint| host.contains(hint))
}

/// URL form of [`is_search_host`]; invalid URLs are not search pages
pub fn is_search_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(is_search_host))
        .unwrap_or(false)
}

/// Page info snapshot for the `getPageInfo` message
pub fn page_info(page: &PageModel) -> PageInfo {
    PageInfo {
        query: extract_search_query(&page.url).unwrap_or_default(),
        title: page.title.clone(),
        url: page.url.clone(),
    }
}

// =============================================================================
// Auto-keyword derivation
// =============================================================================

/// Split a query into highlightable words: whitespace-delimited, negated
/// terms (leading `-`) excluded, duplicates removed in first-seen order.
pub fn parse_query_words(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for word in query.split_whitespace() {
        if word.starts_with('-') {
            continue;
        }
        if seen.insert(word.to_string()) {
            words.push(word.to_string());
        }
    }
    words
}

/// Turn query words into auto-derived slots: capped, palette color assigned
/// by position (cyclic when the palette is shorter than the cap).
pub fn derive_auto_slots(words: &[String]) -> Vec<KeywordSlot> {
    words
        .iter()
        .take(MAX_AUTO_KEYWORDS)
        .enumerate()
        .map(|(index, word)| KeywordSlot::auto(word, palette_color(index)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
