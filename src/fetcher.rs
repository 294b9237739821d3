//! HTTP GET with ETag/Last-Modified conditional caching (spec §4.3).
//!
//! Grounded on the conditional-GET round trip used by the retrieval pack's
//! `oaeen-rssr` feed fetcher, generalized from "feed bytes" to "any source
//! bytes" and extended with the `--no-etag` gate from spec §6.

use reqwest::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use std::time::Duration;

use crate::models::EtagRecord;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub body: Vec<u8>,
    pub etag: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FetchStatus {
    Updated(FetchedBody),
    NotModified,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
}

/// `fetch(url) -> (body_bytes, status)` per spec §4.3. `cache` is the prior
/// `EtagRecord` for this URL, if any; `no_etag` disables sending the
/// conditional headers (the fetcher still records whatever ETag the origin
/// volunteers, so re-enabling caching later doesn't need a cold start).
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    cache: Option<&EtagRecord>,
    no_etag: bool,
) -> Result<FetchStatus, FetchError> {
    let mut request = client.get(url);

    if !no_etag {
        if let Some(record) = cache {
            if let Some(etag) = &record.etag {
                request = request.header(IF_NONE_MATCH, etag.as_str());
            }
            let formatted = httpdate::fmt_http_date(
                std::time::UNIX_EPOCH + Duration::from_secs(record.last_seen_time.max(0) as u64),
            );
            request = request.header(IF_MODIFIED_SINCE, formatted);
        }
    }

    let response = request.send().await?;
    let status = response.status();
    if status.as_u16() == 304 {
        return Ok(FetchStatus::NotModified);
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let etag = response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let _last_modified = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let body = response.bytes().await?.to_vec();
    Ok(FetchStatus::Updated(FetchedBody { body, etag }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxStatus};
    use axum::response::Response as AxResponse;
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct TestState {
        requests: Arc<AtomicUsize>,
    }

    async fn handler(State(state): State<TestState>, headers: HeaderMap) -> AxResponse {
        state.requests.fetch_add(1, Ordering::SeqCst);
        let etag = "\"v1\"";
        if headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()) == Some(etag) {
            let mut resp = AxResponse::new(axum::body::Body::empty());
            *resp.status_mut() = AxStatus::NOT_MODIFIED;
            resp.headers_mut()
                .insert(reqwest::header::ETAG, etag.parse().unwrap());
            return resp;
        }
        let mut resp = AxResponse::new(axum::body::Body::from("hello"));
        resp.headers_mut()
            .insert(reqwest::header::ETAG, etag.parse().unwrap());
        resp
    }

    async fn spawn() -> (String, tokio::task::JoinHandle<()>) {
        let state = TestState {
            requests: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new().route("/x", get(handler)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let join = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/x"), join)
    }

    #[tokio::test]
    async fn conditional_get_round_trip() {
        let (url, task) = spawn().await;
        let client = reqwest::Client::new();

        let first = fetch(&client, &url, None, false).await.unwrap();
        let body = match first {
            FetchStatus::Updated(b) => b,
            FetchStatus::NotModified => panic!("expected fresh body"),
        };
        assert_eq!(body.body, b"hello");
        assert_eq!(body.etag.as_deref(), Some("\"v1\""));

        let record = EtagRecord {
            feed_url: url.clone(),
            etag: body.etag.clone(),
            last_seen_time: 0,
        };
        let second = fetch(&client, &url, Some(&record), false).await.unwrap();
        assert!(matches!(second, FetchStatus::NotModified));

        task.abort();
    }

    #[tokio::test]
    async fn no_etag_flag_skips_conditional_headers() {
        let (url, task) = spawn().await;
        let client = reqwest::Client::new();
        let record = EtagRecord {
            feed_url: url.clone(),
            etag: Some("\"v1\"".to_string()),
            last_seen_time: 0,
        };
        let result = fetch(&client, &url, Some(&record), true).await.unwrap();
        assert!(matches!(result, FetchStatus::Updated(_)));
        task.abort();
    }
}
