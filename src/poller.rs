//! Periodic concurrent refresh over all sources (spec §4.5).
//!
//! The per-source isolation (`match ... { Ok => .., Err(e) => log & skip }`)
//! is grounded on the teacher's own `src/bin/bitvia-news.rs` main loop,
//! generalized to run every source concurrently via `tokio::spawn` and
//! driven by a `tokio::select!`-gated sleep/timeout loop patterned on the
//! retrieval pack's `xAMA0x-ReadRSS` poller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use md5::{Digest, Md5};
use tokio::sync::broadcast;

use crate::adapter::AdapterOutcome;
use crate::fetcher::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_ROUND_TIMEOUT};
use crate::models::{Entry, PublishedTime, RawEntry};
use crate::normalizer;
use crate::state::AppState;

/// Derives `id` per spec §3 when the adapter didn't supply one: prefer
/// `link`, else `source_url + ":" + hex(md5(description))`.
fn derive_id(raw: &RawEntry, source_url: &str) -> String {
    if let Some(id) = &raw.id {
        if !id.is_empty() {
            return id.clone();
        }
    }
    if let Some(link) = &raw.link {
        if !link.is_empty() {
            return link.clone();
        }
    }
    let description = raw.description.clone().unwrap_or_default();
    let digest = Md5::digest(description.as_bytes());
    format!("{source_url}:{}", hex::encode(digest))
}

/// Permissive date parse → epoch seconds, falling back to 0 (spec §4.2).
fn resolve_published_time(published: &Option<PublishedTime>) -> i64 {
    match published {
        None => 0,
        Some(PublishedTime::Epoch(t)) => *t,
        Some(PublishedTime::Text(s)) => parse_permissive(s).unwrap_or(0),
    }
}

fn parse_permissive(s: &str) -> Option<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

/// Normalization pipeline steps 1-6 from spec §4.5; step 7 (upsert) is the
/// caller's responsibility since it is batched per source.
fn normalize(raw: RawEntry, feed_title: &Option<String>, source_url: &str) -> Entry {
    let base = url::Url::parse(source_url).ok();

    let link = raw
        .link
        .as_deref()
        .and_then(|l| base.as_ref().and_then(|b| normalizer::absolutize_url(l, b)));

    let description = raw.description.as_deref().map(|d| {
        let absolutized = match &base {
            Some(b) => normalizer::absolutize(d, b),
            None => d.to_string(),
        };
        normalizer::sanitize(&absolutized)
    });

    let published_time = resolve_published_time(&raw.published);
    let id = derive_id(&raw, source_url);

    Entry {
        id,
        source: source_url.to_string(),
        source_title: feed_title.clone(),
        title: raw.title,
        description,
        link,
        published_time,
        links: raw.links,
        extra: Default::default(),
    }
}

/// Runs one full refresh across every configured source. Failing sources
/// are logged and skipped; they never cancel the round (spec §4.5, §7).
pub async fn poll_all(state: &Arc<AppState>) {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .user_agent("feedhub/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let mut handles = Vec::new();
    for adapter in &state.feeds {
        let client = client.clone();
        let state = Arc::clone(state);
        let source_url = adapter.source_url().to_string();
        let adapter = Arc::clone(adapter);
        handles.push(tokio::spawn(async move {
            let result = poll_one(&state, &client, adapter.as_ref()).await;
            (source_url, result)
        }));
    }

    for handle in handles {
        match handle.await {
            Ok((source_url, Ok(()))) => {
                tracing::info!(source = %source_url, "poll succeeded");
            }
            Ok((source_url, Err(e))) => {
                tracing::warn!(source = %source_url, error = %e, "poll failed, skipping source");
            }
            Err(e) => {
                tracing::warn!(error = %e, "poll task panicked");
            }
        }
    }

    state.mark_updated();
}

async fn poll_one(
    state: &Arc<AppState>,
    client: &reqwest::Client,
    adapter: &dyn crate::adapter::Adapter,
) -> anyhow::Result<()> {
    let source_url = adapter.source_url().to_string();
    let cache = state.store.get_etag(&source_url)?;
    let outcome = adapter.fetch(client, cache.as_ref(), state.no_etag).await?;

    let (fetch_result, etag) = match outcome {
        AdapterOutcome::NotModified => return Ok(()),
        AdapterOutcome::Updated { result, etag } => (result, etag),
    };

    if let Some(etag) = etag {
        state.store.put_etag(&source_url, &etag, Utc::now().timestamp())?;
    }

    let entries: Vec<Entry> = fetch_result
        .entries
        .into_iter()
        .map(|raw| normalize(raw, &fetch_result.feed_title, &fetch_result.url))
        .collect();

    state.store.put_entries(&entries)?;
    Ok(())
}

/// Background loop: sleeps for `period`, then runs `poll_all()` under a
/// round-level timeout. Cancellable via `shutdown`. Timeouts are logged,
/// never fatal (spec §4.5).
pub async fn run(state: Arc<AppState>, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                match tokio::time::timeout(DEFAULT_ROUND_TIMEOUT, poll_all(&state)).await {
                    Ok(()) => {}
                    Err(_) => tracing::warn!("poll round timed out"),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("poller shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_prefers_explicit_id_then_link_then_hash() {
        let raw = RawEntry {
            id: Some("explicit".to_string()),
            link: Some("https://h/x".to_string()),
            ..Default::default()
        };
        assert_eq!(derive_id(&raw, "https://h/feed"), "explicit");

        let raw = RawEntry {
            id: None,
            link: Some("https://h/x".to_string()),
            ..Default::default()
        };
        assert_eq!(derive_id(&raw, "https://h/feed"), "https://h/x");

        let raw = RawEntry {
            id: None,
            link: None,
            description: Some("hello".to_string()),
            ..Default::default()
        };
        let id = derive_id(&raw, "https://h/feed");
        assert!(id.starts_with("https://h/feed:"));
    }

    #[test]
    fn unparseable_date_becomes_zero() {
        assert_eq!(
            resolve_published_time(&Some(PublishedTime::Text("not a date".to_string()))),
            0
        );
        assert_eq!(resolve_published_time(&None), 0);
    }

    #[test]
    fn rfc2822_date_parses_to_epoch() {
        let t = resolve_published_time(&Some(PublishedTime::Text(
            "Tue, 24 Feb 2026 10:00:00 GMT".to_string(),
        )));
        assert!(t > 0);
    }

    #[test]
    fn normalize_absolutizes_link_and_sanitizes_description() {
        let raw = RawEntry {
            id: None,
            title: Some("T".to_string()),
            description: Some("<script>x</script><p>Hello <a href='/y'>y</a></p>".to_string()),
            link: Some("/item/1".to_string()),
            published: None,
            links: vec![],
        };
        let entry = normalize(raw, &Some("Feed".to_string()), "https://h/feed");
        assert_eq!(entry.link.as_deref(), Some("https://h/item/1"));
        let desc = entry.description.unwrap();
        assert!(!desc.contains("script"));
        assert!(desc.contains("https://h/y"));
    }
}
