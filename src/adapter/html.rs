//! Scrapes an HTML page via CSS selectors into normalized entries.
//!
//! Grounded on `original_source/html_adapter.py`'s `HTMLAdapter` class and
//! the `tg::`/`lb::` adapter registry entries in `feedor.py`/`more_adapters.py`.

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::selectors::{eval, FieldSelector, FieldValue};
use super::AdapterOutcome;
use crate::fetcher::{self, FetchStatus};
use crate::models::{EtagRecord, FetchResult, RawEntry};
use crate::normalizer;

/// One configured HTML-scraping source: an item selector plus a field map.
/// `links` selectors are evaluated in order and their enclosures
/// concatenated, matching the `tg::` adapter's photo+video combination.
pub struct HtmlAdapter {
    pub url: String,
    pub item_selector: String,
    pub title: Option<FieldSelector>,
    pub description: Option<FieldSelector>,
    pub link: Option<FieldSelector>,
    pub id: Option<FieldSelector>,
    pub published: Option<FieldSelector>,
    pub links: Vec<FieldSelector>,
}

impl HtmlAdapter {
    /// The `tg::<channel>` adapter: `https://t.me/s/<channel>`, one entry
    /// per `.tgme_widget_message`, per `feedor.py`'s `adapters["tg"]`.
    pub fn telegram(channel: &str) -> Self {
        HtmlAdapter {
            url: format!("https://t.me/s/{channel}"),
            item_selector: ".tgme_widget_message".to_string(),
            title: Some(FieldSelector::Text(
                ".tgme_widget_message_owner_name".to_string(),
            )),
            description: Some(FieldSelector::Html(
                ".tgme_widget_message_text".to_string(),
            )),
            link: Some(FieldSelector::Attr(
                "a.tgme_widget_message_date".to_string(),
                "href".to_string(),
            )),
            id: Some(FieldSelector::Attr(
                "a.tgme_widget_message_date".to_string(),
                "href".to_string(),
            )),
            published: Some(FieldSelector::Attr(
                "time".to_string(),
                "datetime".to_string(),
            )),
            links: vec![
                FieldSelector::EnclosuresRegex(
                    ".tgme_widget_message_photo_wrap".to_string(),
                    "style".to_string(),
                    r"url\('(.+)'\)".to_string(),
                    1,
                ),
                FieldSelector::Enclosures("video".to_string(), "src".to_string()),
            ],
        }
    }

    /// The `lb::<url>` lazyblog adapter, per `more_adapters.py`.
    pub fn lazyblog(url: &str) -> Self {
        HtmlAdapter {
            url: url.to_string(),
            item_selector: "main li".to_string(),
            title: Some(FieldSelector::Text("a.title".to_string())),
            description: Some(FieldSelector::Html("p".to_string())),
            link: Some(FieldSelector::Attr(
                "a.title".to_string(),
                "href".to_string(),
            )),
            id: Some(FieldSelector::Attr(
                "a.title".to_string(),
                "href".to_string(),
            )),
            published: Some(FieldSelector::Text("time:nth-of-type(1)".to_string())),
            links: Vec::new(),
        }
    }
}

fn document_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl super::Adapter for HtmlAdapter {
    fn source_url(&self) -> &str {
        &self.url
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        cache: Option<&EtagRecord>,
        no_etag: bool,
    ) -> anyhow::Result<AdapterOutcome> {
        let status = fetcher::fetch(client, &self.url, cache, no_etag).await?;
        let fetched = match status {
            FetchStatus::NotModified => return Ok(AdapterOutcome::NotModified),
            FetchStatus::Updated(body) => body,
        };

        let base = Url::parse(&self.url)?;
        let raw_html = String::from_utf8_lossy(&fetched.body).into_owned();
        let absolutized = normalizer::absolutize(&raw_html, &base);
        let doc = Html::parse_document(&absolutized);
        let feed_title = document_title(&doc);

        let item_selector = Selector::parse(&self.item_selector)
            .map_err(|e| anyhow::anyhow!("invalid item selector {}: {e:?}", self.item_selector))?;

        let mut entries = Vec::new();
        for item in doc.select(&item_selector) {
            let mut raw = RawEntry::default();

            if let Some(sel) = &self.title {
                if let Some(FieldValue::Text(t)) = eval(sel, item) {
                    raw.title = Some(t);
                }
            }
            if let Some(sel) = &self.description {
                if let Some(FieldValue::Text(t)) = eval(sel, item) {
                    raw.description = Some(t);
                }
            }
            if let Some(sel) = &self.link {
                if let Some(FieldValue::Text(t)) = eval(sel, item) {
                    raw.link = Some(t);
                }
            }
            if let Some(sel) = &self.id {
                if let Some(FieldValue::Text(t)) = eval(sel, item) {
                    raw.id = Some(t);
                }
            }
            if let Some(sel) = &self.published {
                if let Some(FieldValue::Text(t)) = eval(sel, item) {
                    raw.published = Some(crate::models::PublishedTime::Text(t));
                }
            }
            for sel in &self.links {
                if let Some(FieldValue::Links(mut links)) = eval(sel, item) {
                    raw.links.append(&mut links);
                }
            }

            entries.push(raw);
        }

        Ok(AdapterOutcome::Updated {
            result: FetchResult {
                url: self.url.clone(),
                feed_title,
                entries,
            },
            etag: fetched.etag,
        })
    }
}
