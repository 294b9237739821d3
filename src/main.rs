use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::services::ServeFile;

mod adapter;
mod cli;
mod error;
mod feeds_list;
mod fetcher;
mod handlers;
mod models;
mod normalizer;
mod poller;
mod render;
mod state;
mod store;

use cli::Args;
use state::AppState;
use store::Store;

/// Renders the latest page to `path`; format is chosen by extension
/// (`.atom`, `.html`, otherwise RSS), per spec §6's `-f` flag.
fn render_static(state: &AppState, path: &str) -> Result<()> {
    let (entries, cursor) = state
        .store
        .list(state.page_limit, None)
        .context("listing entries for static render")?;

    let body = if path.ends_with(".atom") {
        render::render_atom(&entries, cursor)
    } else if path.ends_with(".html") {
        render::render_html(&entries, cursor, state.last_updated_at())
            .context("rendering static HTML")?
    } else {
        render::render_rss(&entries, cursor)
    };

    std::fs::write(path, body).with_context(|| format!("writing static render to {path}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let store = Store::open(&args.db_path)
        .with_context(|| format!("opening store at {}", args.db_path))?;
    let feeds: Vec<Arc<dyn adapter::Adapter>> =
        feeds_list::load(std::path::Path::new(&args.feeds_path))
            .with_context(|| format!("loading feed list from {}", args.feeds_path))?
            .into_iter()
            .map(Arc::from)
            .collect();
    tracing::info!(sources = feeds.len(), "loaded feed list");

    let state = Arc::new(AppState::new(store, feeds, args.no_etag, args.limit));

    if args.update {
        tracing::info!("running one-shot update before serving");
        poller::poll_all(&state).await;
    }

    if let Some(path) = &args.output_file {
        render_static(&state, path)?;
        tracing::info!(path, "wrote static render");
        return Ok(());
    }

    if !args.serve {
        return Ok(());
    }

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(poller::run(
        Arc::clone(&state),
        Duration::from_secs(args.period_secs),
        shutdown_rx,
    ));

    let app = build_router(state);

    let bind_addr = args
        .bind
        .parse()
        .with_context(|| format!("{} must be HOST:PORT", args.bind))?;
    tracing::info!(%bind_addr, "listening");
    let listener = TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await.context("server crashed")
}

/// Assembles the routes from spec §6. Shared by `main` and the
/// HTTP-surface tests below so both exercise the same wiring.
fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::feed::rss))
        .route("/rss.xml", get(handlers::feed::rss))
        .route("/atom.xml", get(handlers::feed::atom))
        .route("/feed.html", get(handlers::feed::html))
        .route("/search", get(handlers::search::search))
        .route_service("/feed.css", ServeFile::new("static/feed.css"))
        .route_service("/feed.xsl", ServeFile::new("static/feed.xsl"))
        .route_service("/atom.xsl", ServeFile::new("static/atom.xsl"))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entry, EntryLink};

    fn sample_entry(id: &str, time: i64, title: &str) -> Entry {
        Entry {
            id: id.to_string(),
            source: "https://h/feed".to_string(),
            source_title: Some("Feed".to_string()),
            title: Some(title.to_string()),
            description: Some(format!("<p>{title}</p>")),
            link: Some(format!("https://h/{id}")),
            published_time: time,
            links: vec![EntryLink {
                href: "https://h/img.png".to_string(),
                link_type: Some("image/png".to_string()),
                length: 0,
                rel: Some("enclosure".to_string()),
            }],
            extra: Default::default(),
        }
    }

    async fn spawn_test_server() -> (String, tokio::task::JoinHandle<()>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("feeds.db")).unwrap();
        store
            .put_entries(&[sample_entry("1", 100, "A"), sample_entry("2", 200, "B")])
            .unwrap();
        let state = Arc::new(AppState::new(store, Vec::new(), false, 50));
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let join = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), join, dir)
    }

    #[tokio::test]
    async fn rss_route_returns_latest_entries_first() {
        let (base, task, _dir) = spawn_test_server().await;
        let body = reqwest::get(format!("{base}/rss.xml"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("<rss"));
        assert!(body.find("Title B").unwrap() < body.find("Title A").unwrap());
        task.abort();
    }

    #[tokio::test]
    async fn atom_route_serves_atom_content_type() {
        let (base, task, _dir) = spawn_test_server().await;
        let response = reqwest::get(format!("{base}/atom.xml")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.contains("atom"));
        task.abort();
    }

    #[tokio::test]
    async fn search_without_query_param_is_bad_request() {
        let (base, task, _dir) = spawn_test_server().await;
        let response = reqwest::get(format!("{base}/search")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        task.abort();
    }

    #[tokio::test]
    async fn rss_with_malformed_cursor_is_bad_request() {
        let (base, task, _dir) = spawn_test_server().await;
        let response = reqwest::get(format!("{base}/rss.xml?next=not-a-cursor"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        task.abort();
    }

    #[test]
    fn render_static_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("feeds.db")).unwrap();
        store.put_entries(&[sample_entry("1", 100, "A")]).unwrap();
        let state = AppState::new(store, Vec::new(), false, 50);

        let out_path = dir.path().join("out.atom");
        render_static(&state, out_path.to_str().unwrap()).unwrap();
        let contents = std::fs::read_to_string(&out_path).unwrap();
        assert!(contents.contains("<feed"));
    }
}
