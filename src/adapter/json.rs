//! Projects a JSON API response through two mapping closures (spec §4.2).
//!
//! Grounded on `original_source/html_adapter.py`'s `JSONAdapter` class (POST
//! with a JSON parameter object, then `get_items`/`get_entry` projection)
//! and the teacher's `rpc.rs` request/response shape, simplified to a plain
//! POST since no JSON-RPC envelope or basic auth applies here.

use async_trait::async_trait;

use super::AdapterOutcome;
use crate::models::{EtagRecord, FetchResult, RawEntry};

type GetItems = Box<dyn Fn(&serde_json::Value) -> Vec<serde_json::Value> + Send + Sync>;
type GetEntry = Box<dyn Fn(&serde_json::Value) -> RawEntry + Send + Sync>;

/// A JSON-API source: POSTs `params` to `url`, selects the item list with
/// `get_items`, then maps each item to a `RawEntry` with `get_entry`.
///
/// Not wired to any `feeds.txt` scheme in this crate (§6 only recognizes
/// `tg::`/`lb::`), but a complete, independently testable building block,
/// exactly as the original's `mk::` (Misskey) registry entry existed
/// alongside schemes the distilled feed-list syntax never documented.
pub struct JsonAdapter {
    pub url: String,
    pub params: serde_json::Value,
    pub feed_title: String,
    pub get_items: GetItems,
    pub get_entry: GetEntry,
}

impl JsonAdapter {
    pub fn new(
        url: impl Into<String>,
        params: serde_json::Value,
        get_items: GetItems,
        get_entry: GetEntry,
    ) -> Self {
        JsonAdapter {
            url: url.into(),
            params,
            feed_title: "JSONParser Feed".to_string(),
            get_items,
            get_entry,
        }
    }
}

#[async_trait]
impl super::Adapter for JsonAdapter {
    fn source_url(&self) -> &str {
        &self.url
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        _cache: Option<&EtagRecord>,
        _no_etag: bool,
    ) -> anyhow::Result<AdapterOutcome> {
        let response: serde_json::Value = client
            .post(&self.url)
            .json(&self.params)
            .send()
            .await?
            .json()
            .await?;

        let entries = (self.get_items)(&response)
            .iter()
            .map(|item| (self.get_entry)(item))
            .collect();

        Ok(AdapterOutcome::Updated {
            result: FetchResult {
                url: self.url.clone(),
                feed_title: Some(self.feed_title.clone()),
                entries,
            },
            etag: None,
        })
    }
}
