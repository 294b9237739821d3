//! HTTP route handlers (spec §6). Thin collaborators over `Store`/`render`;
//! all query parsing and error mapping lives here, nowhere deeper.

pub mod feed;
pub mod search;

use serde::Deserialize;

use crate::models::PageCursor;

/// Shared paging query params: `next=<time>:<rowid>`, `limit=N`.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub next: Option<String>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Parses `next` into a `PageCursor`. An absent `next` is fine (first
    /// page); a malformed one is a client error (spec §7, "Client request").
    pub fn cursor(&self) -> Result<Option<PageCursor>, crate::error::AppError> {
        match &self.next {
            None => Ok(None),
            Some(raw) => PageCursor::parse(raw)
                .map(Some)
                .ok_or_else(|| crate::error::AppError::BadRequest(format!("bad next cursor: {raw}"))),
        }
    }

    pub fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default)
    }
}
