use serde::{Deserialize, Serialize};

/// Enclosure or related link attached to an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryLink {
    pub href: String,
    #[serde(default, rename = "type")]
    pub link_type: Option<String>,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub rel: Option<String>,
}

/// A single normalized item from one source, per the entries.data JSON blob.
///
/// `extra` preserves source-specific keys an adapter produced that have no
/// well-known field here, so nothing round-tripped through the store is lost.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Entry {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub source_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub published_time: i64,
    #[serde(default)]
    pub links: Vec<EntryLink>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Row produced by an adapter before the poller's normalization pipeline has
/// stamped `id`, `source`, `source_title` and absolutized/sanitized fields.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    /// RFC-822/ISO-8601 date string, or already-resolved epoch seconds.
    pub published: Option<PublishedTime>,
    pub links: Vec<EntryLink>,
}

#[derive(Debug, Clone)]
pub enum PublishedTime {
    Text(String),
    Epoch(i64),
}

/// Output of one adapter invocation against one configured source.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub url: String,
    pub feed_title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// `(feed_url, etag, last_seen_time)`, mutated only by the ConditionalFetcher.
#[derive(Debug, Clone)]
pub struct EtagRecord {
    pub feed_url: String,
    pub etag: Option<String>,
    pub last_seen_time: i64,
}

/// `(published_time, rowid)` cursor echoed back by paging clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub time: i64,
    pub rowid: i64,
}

impl PageCursor {
    pub fn to_query_param(self) -> String {
        format!("{}:{}", self.time, self.rowid)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (t, r) = s.split_once(':')?;
        Some(PageCursor {
            time: t.parse().ok()?,
            rowid: r.parse().ok()?,
        })
    }
}

/// One row of the `entries` table as handed back by `list`/`search`.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry: Entry,
    pub rowid: i64,
}
