//! Loads `feeds.txt` into a list of boxed adapters (spec §6).
//!
//! Blank lines and `#` comments are ignored. A bare URL dispatches to
//! `SyndicationAdapter`; `<scheme>::<arg>` dispatches to a named adapter;
//! unknown schemes degrade to treating the first argument as a bare URL,
//! matching `feedor.py`'s `adapt()`/`adapters.get(..., lambda x, *_: x)`.

use std::path::Path;

use crate::adapter::{Adapter, HtmlAdapter, SyndicationAdapter};

pub fn load(path: &Path) -> anyhow::Result<Vec<Box<dyn Adapter>>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading feed list {}: {e}", path.display()))?;
    Ok(contents.lines().filter_map(parse_line).collect())
}

fn parse_line(line: &str) -> Option<Box<dyn Adapter>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(adapt(line))
}

fn adapt(line: &str) -> Box<dyn Adapter> {
    if line.contains("::") {
        let mut parts = line.split("::");
        let scheme = parts.next().unwrap_or_default();
        let first_arg = parts.next().unwrap_or_default();
        return match scheme {
            "tg" => Box::new(HtmlAdapter::telegram(first_arg)),
            "lb" => Box::new(HtmlAdapter::lazyblog(first_arg)),
            _ => Box::new(SyndicationAdapter::new(first_arg.to_string())),
        };
    }
    Box::new(SyndicationAdapter::new(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_url_becomes_syndication_source() {
        let adapters: Vec<Box<dyn Adapter>> = "https://example.com/feed.xml\n"
            .lines()
            .filter_map(parse_line)
            .collect();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source_url(), "https://example.com/feed.xml");
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# comment\n\nhttps://example.com/feed.xml\n";
        let adapters: Vec<Box<dyn Adapter>> = text.lines().filter_map(parse_line).collect();
        assert_eq!(adapters.len(), 1);
    }

    #[test]
    fn telegram_scheme_dispatches_to_html_adapter() {
        let adapters: Vec<Box<dyn Adapter>> =
            "tg::examplechannel\n".lines().filter_map(parse_line).collect();
        assert_eq!(adapters[0].source_url(), "https://t.me/s/examplechannel");
    }

    #[test]
    fn unknown_scheme_degrades_to_raw_first_argument_as_url() {
        let adapters: Vec<Box<dyn Adapter>> =
            "mk::example.social::abc123\n".lines().filter_map(parse_line).collect();
        assert_eq!(adapters[0].source_url(), "example.social");
    }
}
