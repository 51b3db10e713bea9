//! API error type.
//!
//! Every failure reaching a handler becomes HTTP 500 with
//! `{"status": "ERROR", "error": <message>}`. Clients get no error codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::data::DataError;
use crate::screener::ScreenerError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Screener(#[from] ScreenerError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::error!(error = %message, "Request failed");

        let body = json!({
            "status": "ERROR",
            "error": message,
        });

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
