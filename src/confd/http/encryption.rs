//! `/encrypt`, `/decrypt`, `/key`, `/encrypt/status`.
//!
//! The `{name}/{profiles}` path variants let a client address a
//! non-default encryptor; this service has exactly one `ActiveKey`, so
//! those segments are accepted (for wire compatibility) and otherwise
//! ignored -- recorded as an open simplification in DESIGN.md.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::error::AppError;
use super::AppState;

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn encrypt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<String, AppError> {
    Ok(state.encryption.encrypt(content_type(&headers).as_deref(), &body)?)
}

pub async fn encrypt_named(
    State(state): State<Arc<AppState>>,
    Path((_name, _profiles)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Result<String, AppError> {
    Ok(state.encryption.encrypt(content_type(&headers).as_deref(), &body)?)
}

pub async fn decrypt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<String, AppError> {
    Ok(state.encryption.decrypt(content_type(&headers).as_deref(), &body)?)
}

pub async fn decrypt_named(
    State(state): State<Arc<AppState>>,
    Path((_name, _profiles)): Path<(String, String)>,
    headers: HeaderMap,
    body: String,
) -> Result<String, AppError> {
    Ok(state.encryption.decrypt(content_type(&headers).as_deref(), &body)?)
}

pub async fn public_key(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    Ok(state.encryption.public_key_pem()?)
}

pub async fn public_key_named(
    State(state): State<Arc<AppState>>,
    Path((_name, _profiles)): Path<(String, String)>,
) -> Result<String, AppError> {
    Ok(state.encryption.public_key_pem()?)
}

#[derive(Serialize)]
struct Status {
    status: &'static str,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Status>, AppError> {
    state.encryption.status()?;
    Ok(Json(Status { status: "OK" }))
}
