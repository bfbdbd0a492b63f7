//! Cascading text extraction from raw HTML.
//!
//! Single-page applications and heavily scripted sites often yield thin
//! `<body>` text, so extraction runs a layered fallback: whole-body visible
//! text first, then an ordered selector cascade that recovers structured
//! content, then the full document as a last resort. The result is cleaned
//! of boilerplate, bounded for the completion service, and rejected outright
//! when too little text survives.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use tracing::debug;

/// Body text at or above this length is accepted without fallbacks.
const SHORT_TEXT_LEN: usize = 100;

/// Below this, the full-document dump is attempted.
const VERY_SHORT_TEXT_LEN: usize = 50;

/// Smallest fragment the selector cascade keeps.
const MIN_FRAGMENT_LEN: usize = 3;

/// Final results under this length are rejected.
const MIN_CONTENT_LEN: usize = 20;

/// Upper bound on text handed to the completion service.
const MAX_CONTENT_LEN: usize = 15_000;

/// Elements whose text is never content.
const SKIP_TAGS: [&str; 5] = ["script", "style", "noscript", "iframe", "svg"];

/// Content-bearing selectors in priority order: semantic containers, then
/// headings, then generic block and inline containers.
const CONTENT_SELECTORS: [&str; 21] = [
    "article",
    "main",
    "[role='main']",
    ".content",
    ".main-content",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#content",
    "#main-content",
    "h1, h2, h3, h4, h5, h6",
    "p",
    "section",
    "div",
    "span",
    "li",
    "td",
    "dd",
    "blockquote",
    "pre",
    "code",
];

lazy_static! {
    /// Noise phrases removed from extracted text, case-insensitive.
    static ref BOILERPLATE: Vec<Regex> = [
        r"(?i)cookie\s*policy",
        r"(?i)privacy\s*policy",
        r"(?i)terms\s*of\s*service",
        r"(?i)skip\s*to\s*content",
        r"(?i)accept\s*cookies",
        r"(?i)\[object\s*object\]",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();
}

/// Extraction yielded too little usable text.
#[derive(Debug, Clone, Error)]
#[error(
    "insufficient content scraped from website (only {text_len} characters found); \
     the site may require JavaScript to load content, block automated access, or be \
     a single-page application (HTML length: {html_len} characters)"
)]
pub struct ExtractError {
    pub text_len: usize,
    pub html_len: usize,
}

/// Extract a bounded plain-text excerpt from raw HTML.
pub fn extract_content(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);

    let mut text = body_text(&document);
    debug!(len = text.chars().count(), "initial text extraction");

    if text.chars().count() < SHORT_TEXT_LEN {
        if let Some(collected) = selector_cascade(&document) {
            debug!(len = collected.chars().count(), "selector extraction");
            text = collected;
        }
    }

    if text.chars().count() < VERY_SHORT_TEXT_LEN {
        text = visible_text(document.root_element());
        debug!(len = text.chars().count(), "full text extraction");
    }

    let text = truncate(&strip_boilerplate(&text));

    let text_len = text.chars().count();
    if text_len < MIN_CONTENT_LEN {
        return Err(ExtractError {
            text_len,
            html_len: html.chars().count(),
        });
    }

    debug!(len = text_len, "final extracted text");
    Ok(text)
}

/// Visible text of the `<body>` element, whitespace collapsed.
fn body_text(document: &Html) -> String {
    match Selector::parse("body") {
        Ok(selector) => document
            .select(&selector)
            .next()
            .map(visible_text)
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Walk the ordered selector list collecting trimmed fragments, skipping
/// exact repeats, until enough text has accumulated.
fn selector_cascade(document: &Html) -> Option<String> {
    let mut fragments: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected_len = 0usize;

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };

        for element in document.select(&selector) {
            let fragment = visible_text(element);
            if fragment.chars().count() >= MIN_FRAGMENT_LEN && seen.insert(fragment.clone()) {
                collected_len += fragment.chars().count() + 1;
                fragments.push(fragment);
            }
        }

        // Enough content; lower-priority selectors are not scanned
        if collected_len > SHORT_TEXT_LEN {
            break;
        }
    }

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" "))
    }
}

/// All descendant text of one element except text under non-content tags,
/// whitespace runs collapsed to single spaces.
fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    collapse_whitespace(&out)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if !SKIP_TAGS.contains(&e.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_boilerplate(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in BOILERPLATE.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    collapse_whitespace(&cleaned).trim().to_string()
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_CONTENT_LEN {
        let mut truncated: String = text.chars().take(MAX_CONTENT_LEN).collect();
        truncated.push_str("...");
        truncated
    } else {
        text.to_string()
    }
}
