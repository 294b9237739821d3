//! Source-shape to normalized entry-stream adapters (spec §4.2).

pub mod html;
pub mod json;
pub mod selectors;
pub mod syndication;

use async_trait::async_trait;

use crate::models::{EtagRecord, FetchResult};

/// Strategy producing a `FetchResult` from one configured source. Dispatched
/// by the `feeds.txt` line syntax in `feeds_list`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The canonical source URL this adapter fetches, for logging and for
    /// conditional-GET cache lookups.
    fn source_url(&self) -> &str;

    /// Fetches and parses this source. `cache` is the prior `EtagRecord` for
    /// `source_url()`, if any; `no_etag` disables conditional-GET headers.
    /// Adapters that do not support conditional caching (`JsonAdapter`)
    /// ignore both and always return `Updated`.
    async fn fetch(
        &self,
        client: &reqwest::Client,
        cache: Option<&EtagRecord>,
        no_etag: bool,
    ) -> anyhow::Result<AdapterOutcome>;
}

pub enum AdapterOutcome {
    Updated {
        result: FetchResult,
        etag: Option<String>,
    },
    NotModified,
}

pub use html::HtmlAdapter;
pub use json::JsonAdapter;
pub use syndication::SyndicationAdapter;
