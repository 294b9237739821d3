use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use crate::error::AppError;
use crate::render;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

/// `GET /search?q=…` — HTML-rendered full-text search results (spec §6).
/// A missing `q` is a client error, never a poller-affecting one (spec §7).
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let q = query
        .q
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("missing query parameter `q`".to_string()))?;
    let limit = query.limit.unwrap_or(state.page_limit);
    let entries = state.store.search(&q, limit)?;
    let body = render::render_search_html(&q, &entries)?;
    Ok(Html(body))
}
