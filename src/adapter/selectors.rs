//! Tagged-variant selector DSL for `HtmlAdapter` field mappings.
//!
//! Mirrors the `css_text`/`css_html`/`css_attr`/`css_attr_regex`/
//! `css_enclosures`/`css_enclosures_regex` selector builders in
//! `original_source/html_adapter.py`, but as a data variant rather than a
//! closure so adapters stay serializable and unit-testable in isolation
//! (spec §9, "Adapter closures").

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::models::EntryLink;
use crate::normalizer;

#[derive(Debug, Clone)]
pub enum FieldSelector {
    /// Text content of the first match, with `<br>` normalized to newline.
    Text(String),
    /// Sanitized inner HTML of the first match.
    Html(String),
    /// Named attribute of the first match.
    Attr(String, String),
    /// Capture group from a regex applied to the named attribute.
    AttrRegex(String, String, String, usize),
    /// One enclosure per matched element, `href` from the named attribute.
    Enclosures(String, String),
    /// As `Enclosures`, with `href` extracted by a regex capture group.
    EnclosuresRegex(String, String, String, usize),
}

fn parse_selector(sel: &str) -> Option<Selector> {
    Selector::parse(sel).ok()
}

fn first_match<'a>(item: &ElementRef<'a>, sel: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(sel)?;
    item.select(&selector).next()
}

/// Recursively collects text content, inserting `\n` for every `<br>`
/// encountered, matching `css_text`'s `br.tail` rewrite in the original.
fn text_with_br(el: ElementRef) -> String {
    use scraper::Node;
    let mut out = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.push_str(&text_with_br(child_el));
                }
            }
            _ => {}
        }
    }
    out
}

fn guess_enclosure_type(href: &str) -> Option<String> {
    let without_query = href.split('?').next().unwrap_or(href);
    mime_guess::from_path(without_query)
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Evaluates one field selector against a matched item element. Returns
/// `None`/empty when the selector finds nothing, per spec §4.2 ("a field
/// whose selector returns empty is omitted, not emitted as empty").
pub enum FieldValue {
    Text(String),
    Links(Vec<EntryLink>),
}

pub fn eval(field: &FieldSelector, item: ElementRef<'_>) -> Option<FieldValue> {
    match field {
        FieldSelector::Text(sel) => {
            let el = first_match(&item, sel)?;
            let text = text_with_br(el).trim().to_string();
            (!text.is_empty()).then_some(FieldValue::Text(text))
        }
        FieldSelector::Html(sel) => {
            let el = first_match(&item, sel)?;
            let inner = el.inner_html();
            let sanitized = normalizer::sanitize(&inner);
            (!sanitized.trim().is_empty()).then_some(FieldValue::Text(sanitized))
        }
        FieldSelector::Attr(sel, attr) => {
            let el = first_match(&item, sel)?;
            el.value()
                .attr(attr)
                .map(|v| v.to_string())
                .filter(|v| !v.is_empty())
                .map(FieldValue::Text)
        }
        FieldSelector::AttrRegex(sel, attr, pattern, group) => {
            let el = first_match(&item, sel)?;
            let value = el.value().attr(attr)?;
            let re = Regex::new(pattern).ok()?;
            let caps = re.captures(value)?;
            caps.get(*group)
                .map(|m| m.as_str().to_string())
                .map(FieldValue::Text)
        }
        FieldSelector::Enclosures(sel, attr) => {
            let selector = parse_selector(sel)?;
            let links: Vec<EntryLink> = item
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .filter(|v| !v.is_empty())
                .map(|href| EntryLink {
                    link_type: guess_enclosure_type(href),
                    href: href.to_string(),
                    length: 0,
                    rel: Some("enclosure".to_string()),
                })
                .collect();
            (!links.is_empty()).then_some(FieldValue::Links(links))
        }
        FieldSelector::EnclosuresRegex(sel, attr, pattern, group) => {
            let selector = parse_selector(sel)?;
            let re = Regex::new(pattern).ok()?;
            let links: Vec<EntryLink> = item
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .filter_map(|v| re.captures(v))
                .filter_map(|caps| caps.get(group.to_owned()).map(|m| m.as_str().to_string()))
                .map(|href| EntryLink {
                    link_type: guess_enclosure_type(&href),
                    href,
                    length: 0,
                    rel: Some("enclosure".to_string()),
                })
                .collect();
            (!links.is_empty()).then_some(FieldValue::Links(links))
        }
    }
}
