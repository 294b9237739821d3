use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error taxonomy for the serving boundary. Poller-internal failures
/// (fetch/parse/normalizer errors) are logged and swallowed at their own
/// per-source boundary and never reach this type; see `poller`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}
