//! Fetches a URL and parses RSS/Atom/JSON-feed, yielding entries directly.
//!
//! Grounded on the teacher's own `src/bin/bitvia-news.rs::fetch_feed`, which
//! already combined `reqwest` + `feed_rs::parser::parse` for this exact
//! purpose against a rusqlite-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AdapterOutcome;
use crate::fetcher::{self, FetchStatus};
use crate::models::{EntryLink, EtagRecord, FetchResult, PublishedTime, RawEntry};

pub struct SyndicationAdapter {
    pub url: String,
}

impl SyndicationAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        SyndicationAdapter { url: url.into() }
    }
}

fn published_time(entry: &feed_rs::model::Entry) -> Option<PublishedTime> {
    let dt: Option<DateTime<Utc>> = entry
        .updated
        .or(entry.published)
        .map(|d| d.with_timezone(&Utc));
    dt.map(|d| PublishedTime::Epoch(d.timestamp()))
}

fn best_link(entry: &feed_rs::model::Entry) -> Option<String> {
    entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().unwrap_or("") != "self")
        .map(|l| l.href.clone())
        .or_else(|| (!entry.id.is_empty()).then(|| entry.id.clone()))
}

fn best_description(entry: &feed_rs::model::Entry) -> Option<String> {
    if let Some(summary) = entry.summary.as_ref() {
        let text = summary.content.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_ref())
        .map(|b| b.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl super::Adapter for SyndicationAdapter {
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

        let feed = feed_rs::parser::parse(&fetched.body[..])?;
        let feed_title = feed.title.as_ref().map(|t| t.content.trim().to_string());

        let entries = feed
            .entries
            .into_iter()
            .map(|entry| RawEntry {
                id: (!entry.id.is_empty()).then(|| entry.id.clone()),
                title: entry
                    .title
                    .as_ref()
                    .map(|t| t.content.trim().to_string())
                    .filter(|s| !s.is_empty()),
                description: best_description(&entry),
                link: best_link(&entry),
                published: published_time(&entry),
                links: entry
                    .links
                    .iter()
                    .filter(|l| l.rel.as_deref() == Some("enclosure"))
                    .map(|l| EntryLink {
                        href: l.href.clone(),
                        link_type: l.media_type.clone(),
                        length: l.length.unwrap_or(0),
                        rel: l.rel.clone(),
                    })
                    .collect(),
            })
            .collect();

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
