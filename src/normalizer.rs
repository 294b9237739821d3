//! URL absolutization and HTML allow-list sanitization (spec §4.1).
//!
//! Absolutization always runs before sanitization so emitted links are
//! stable regardless of the eventual consumer's base URL.

use ammonia::Builder;
use kuchiki::traits::TendrilSink;
use url::Url;

/// Tags carried over from the allow-list in `original_source/feedor.py`,
/// on top of ammonia's own base set of inline formatting tags.
const EXTRA_TAGS: &[&str] = &[
    "div", "q", "pre", "u", "h1", "h2", "h3", "h4", "h5", "h6", "img", "table", "thead", "tbody",
    "th", "tr", "td", "s", "sub", "sup",
];

fn sanitizer() -> Builder<'static> {
    let mut builder = Builder::default();
    builder.add_tags(EXTRA_TAGS);
    builder.add_tag_attributes("img", &["src"]);
    builder
}

/// Returns HTML containing only allow-listed tags/attributes. Malformed
/// input is not a fatal error: a sanitizer that cannot make sense of its
/// input degrades to an empty string rather than propagating (spec §4.1,
/// §7 Normalizer error).
pub fn sanitize(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    sanitizer().clean(html).to_string()
}

/// Rewrites every URL-bearing attribute (`href`, `src`, `action`) in `html`
/// to an absolute form against `base_url`. Attributes that already hold an
/// absolute URL, or that fail to parse even against the base, are left
/// untouched.
///
/// Parses into a real DOM and mutates attributes in place before
/// reserializing, the same `kuchiki`-based approach as the pack's
/// `wezm-rsspls::rewrite_urls` — a string/replace pass over the serialized
/// HTML can't tell two elements with the same relative attribute value
/// apart, and re-escapes (`&` -> `&amp;`) would desync it from the literal
/// attribute text it's searching for.
pub fn absolutize(html: &str, base_url: &Url) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let doc = kuchiki::parse_html().one(html);
    let base = Url::options().base_url(Some(base_url));
    for attr in ["href", "src", "action"] {
        rewrite_attr(&doc, attr, &base);
    }
    doc.to_string()
}

fn rewrite_attr(doc: &kuchiki::NodeRef, attr: &str, base: &url::ParseOptions) {
    let Ok(matches) = doc.select(&format!("*[{attr}]")) else {
        return;
    };
    for el in matches {
        let mut attrs = el.attributes.borrow_mut();
        if let Some(value) = attrs.get_mut(attr) {
            if let Ok(joined) = base.parse(value) {
                let mut joined = joined.to_string();
                std::mem::swap(value, &mut joined);
            }
        }
    }
}

/// Absolutizes a single standalone URL (e.g. an entry's `link` field)
/// against `base_url`. Returns `None` if `url` is empty or unparseable even
/// relative to the base.
pub fn absolutize_url(url: &str, base_url: &Url) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    base_url.join(trimmed).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_script_and_keeps_allowlisted() {
        let base = Url::parse("https://h/feed").unwrap();
        let input = "<script>x</script><p>Hello <a href='/y'>y</a></p>";
        let absolutized = absolutize(input, &base);
        let out = sanitize(&absolutized);
        assert!(!out.contains("script"));
        assert!(out.contains("https://h/y"));
        assert!(out.contains("Hello"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let input = "<p>hi <b>there</b></p><script>bad()</script>";
        let once = sanitize(input);
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_empty_input_is_empty_output() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn absolutize_is_idempotent() {
        let base = Url::parse("https://example.com/feed").unwrap();
        let input = "<a href=\"/y\">y</a>";
        let once = absolutize(input, &base);
        let twice = absolutize(&once, &base);
        assert_eq!(once, twice);
    }

    #[test]
    fn absolutize_leaves_absolute_urls_untouched() {
        let base = Url::parse("https://example.com/feed").unwrap();
        let input = "<a href=\"https://other.example/z\">z</a>";
        let out = absolutize(input, &base);
        assert!(out.contains("https://other.example/z"));
    }

    #[test]
    fn img_only_allows_src_attribute() {
        let out = sanitize("<img src=\"https://h/i.png\" onerror=\"bad()\">");
        assert!(out.contains("src"));
        assert!(!out.contains("onerror"));
    }
}
