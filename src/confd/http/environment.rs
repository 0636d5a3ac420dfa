//! `GET /{app}/{profile}[/{label}]`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::environment::{materialise, Environment};
use crate::error::ConfdError;

use super::error::AppError;
use super::AppState;

/// `/` inside a path segment is wire-encoded as `(_)`; undo that before
/// touching git.
fn decode_segment(segment: &str) -> String {
    segment.replace("(_)", "/")
}

pub async fn get_environment(
    State(state): State<Arc<AppState>>,
    Path((application, profile)): Path<(String, String)>,
) -> Result<Json<Environment>, AppError> {
    environment_response(state, application, profile, None).await
}

pub async fn get_environment_with_label(
    State(state): State<Arc<AppState>>,
    Path((application, profile, label)): Path<(String, String, String)>,
) -> Result<Json<Environment>, AppError> {
    environment_response(state, application, profile, Some(label)).await
}

async fn environment_response(
    state: Arc<AppState>,
    application: String,
    profile: String,
    label: Option<String>,
) -> Result<Json<Environment>, AppError> {
    let application = decode_segment(&application);
    let profile = decode_segment(&profile);
    let label = label.map(|l| decode_segment(&l));

    let repo = state
        .repository(&application)
        .ok_or_else(|| ConfdError::NoSuchRepository(application.clone()))?;

    let locations = repo
        .get_locations(&application, &profile, label.as_deref())
        .await?;

    let property_sources = materialise(&locations.search_paths, &application, &profile)?;

    let profiles = profile
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    Ok(Json(Environment {
        name: locations.application,
        profiles: if profiles.is_empty() {
            vec!["default".to_string()]
        } else {
            profiles
        },
        label: locations.label,
        version: locations.version,
        property_sources,
        state: None,
    }))
}
