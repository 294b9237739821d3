use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;

use crate::adapter::Adapter;
use crate::store::Store;

/// Generalizes the teacher's flat `AppState{http, rpc_url, ...}` into an
/// explicit `App` context per spec §9's "Global state" redesign flag:
/// `last_updated_at`, the feed list, and the store handle are carried here
/// instead of as process-wide singletons, cloned cheaply via `Arc` into the
/// poller task and every handler.
pub struct AppState {
    pub http: Client,
    pub store: Store,
    pub feeds: Vec<Arc<dyn Adapter>>,
    pub no_etag: bool,
    pub page_limit: u32,
    /// Mutated only by the poller after a successful round (spec §5).
    last_updated_at: AtomicI64,
}

impl AppState {
    /// Seeds `last_updated_at` from the store's own file mtime rather than
    /// wall-clock-at-boot, so the value is meaningful before the first poll
    /// round ever runs (spec §3). Falls back to "now" only if the mtime
    /// can't be read (e.g. a brand-new, not-yet-flushed db file).
    pub fn new(store: Store, feeds: Vec<Arc<dyn Adapter>>, no_etag: bool, page_limit: u32) -> Self {
        let last_updated_at = store.mtime().unwrap_or_else(|_| Utc::now().timestamp());
        AppState {
            http: Client::new(),
            store,
            feeds,
            no_etag,
            page_limit,
            last_updated_at: AtomicI64::new(last_updated_at),
        }
    }

    pub fn last_updated_at(&self) -> i64 {
        self.last_updated_at.load(Ordering::SeqCst)
    }

    pub fn mark_updated(&self) {
        self.last_updated_at.store(Utc::now().timestamp(), Ordering::SeqCst);
    }
}
