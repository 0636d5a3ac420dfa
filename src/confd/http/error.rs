//! Maps `ConfdError` (and anything else that reaches a handler) onto a
//! `{status, description}` JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ConfdError;

#[derive(Serialize)]
struct ErrorBody {
    status: String,
    description: String,
}

/// Wraps any `anyhow::Error` crossing a handler boundary. A
/// `ConfdError` inside gets its documented status/body; anything else
/// is an unexpected 500 with no internal detail on the wire.
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(domain) = self.0.downcast_ref::<ConfdError>() {
            let (status_code, status, description) = http_status(domain);
            return (
                status_code,
                Json(ErrorBody {
                    status: status.to_string(),
                    description,
                }),
            )
                .into_response();
        }

        tracing::error!(err = %self.0, "unhandled error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                status: "INTERNAL_ERROR".to_string(),
                description: "An unexpected error occurred".to_string(),
            }),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> AppError {
        AppError(err.into())
    }
}

fn http_status(err: &ConfdError) -> (StatusCode, &'static str, String) {
    let (status, description) = err.status_and_description();
    let code = match status {
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "NO_KEY" => StatusCode::NOT_FOUND,
        "INVALID" => match err {
            ConfdError::InvalidCipher => StatusCode::BAD_REQUEST,
            _ => StatusCode::NOT_FOUND,
        },
        "BAD_REQUEST" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, status, description)
}
