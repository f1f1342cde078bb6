//! HTML helpers shared by the site handlers
//!
//! Thin wrappers around `scraper` selectors that return `Option`s instead of
//! panicking on a bad selector, plus the number parsing the quote page needs.

use scraper::{ElementRef, Html, Selector};

/// Parses a CSS selector, returning `None` when it is invalid
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Collapses an element's text into one trimmed string
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// All elements matching `css`, in document order
pub fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => document.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Text of the first element matching `css`; empty text counts as absent
pub fn select_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Text of the first descendant of `element` matching `css`
pub fn child_text(element: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = selector(css)?;
    element
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// Attribute `attr` of the first descendant of `element` matching `css`
pub fn child_attr(element: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    element
        .select(&sel)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Full text of the first `<script>` whose content contains `needle`
pub fn script_containing(document: &Html, needle: &str) -> Option<String> {
    let sel = selector("script")?;
    document
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(needle))
}

/// Text inside the last `(...)` pair, e.g. the ticker in `"GameStop Corp. (GME)"`
pub fn parenthesized(text: &str) -> Option<&str> {
    let open = text.rfind('(')?;
    let close = text[open..].find(')')? + open;
    let inner = text[open + 1..close].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Parses an integer with thousands separators (`"32,745,019"`)
pub fn parse_int(raw: &str) -> Option<u64> {
    raw.trim().replace(',', "").parse().ok()
}

/// Parses a price with thousands separators (`"1,118.18"`)
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// True for the placeholder the site shows for unknown values
pub fn is_not_available(raw: &str) -> bool {
    matches!(raw.trim(), "N/A" | "-" | "--" | "")
}
