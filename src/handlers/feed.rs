use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};

use super::PageQuery;
use crate::error::AppError;
use crate::render;
use crate::state::AppState;

async fn page(
    state: &AppState,
    query: &PageQuery,
) -> Result<(Vec<crate::models::StoredEntry>, Option<crate::models::PageCursor>), AppError> {
    let cursor = query.cursor()?;
    let limit = query.limit_or(state.page_limit);
    let (entries, next) = state.store.list(limit, cursor)?;
    Ok((entries, next))
}

/// `GET /`, `GET /rss.xml` — RSS 2.0 of the latest page.
pub async fn rss(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let (entries, next) = page(&state, &query).await?;
    let body = render::render_rss(&entries, next);
    Ok(([(CONTENT_TYPE, "application/rss+xml; charset=utf-8")], body).into_response())
}

/// `GET /atom.xml` — Atom 1.0 of the latest page.
pub async fn atom(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let (entries, next) = page(&state, &query).await?;
    let body = render::render_atom(&entries, next);
    Ok(([(CONTENT_TYPE, "application/atom+xml; charset=utf-8")], body).into_response())
}

/// `GET /feed.html` — HTML view, substituting for the XSLT transform of
/// the RSS document (spec §9, "Template/XSLT collaborator").
pub async fn html(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let (entries, next) = page(&state, &query).await?;
    let body = render::render_html(&entries, next, state.last_updated_at())?;
    Ok(Html(body))
}
