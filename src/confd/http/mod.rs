//! HTTP transport: wires `GitEnvironmentRepository` and
//! `EncryptionService` onto an axum router.

mod encryption;
mod environment;
mod error;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::encryption::EncryptionService;
use crate::git::GitEnvironmentRepository;

pub struct AppState {
    repositories: HashMap<String, Arc<GitEnvironmentRepository>>,
    default_repository: Option<Arc<GitEnvironmentRepository>>,
    encryption: Arc<EncryptionService>,
}

impl AppState {
    pub fn new(
        repositories: HashMap<String, Arc<GitEnvironmentRepository>>,
        encryption: Arc<EncryptionService>,
    ) -> AppState {
        let default_repository = repositories.get("default").cloned();
        AppState {
            repositories,
            default_repository,
            encryption,
        }
    }

    /// An application name that names a configured repository uses it
    /// directly; otherwise requests fall through to the `"default"`
    /// repository, matching a single-repository deployment where the
    /// config file names only one entry.
    fn repository(&self, application: &str) -> Option<Arc<GitEnvironmentRepository>> {
        self.repositories
            .get(application)
            .cloned()
            .or_else(|| self.default_repository.clone())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/encrypt/status", get(encryption::status))
        .route("/encrypt/:name/:profiles", post(encryption::encrypt_named))
        .route("/encrypt", post(encryption::encrypt))
        .route("/decrypt/:name/:profiles", post(encryption::decrypt_named))
        .route("/decrypt", post(encryption::decrypt))
        .route("/key/:name/:profiles", get(encryption::public_key_named))
        .route("/key", get(encryption::public_key))
        .route(
            "/:application/:profile/:label",
            get(environment::get_environment_with_label),
        )
        .route("/:application/:profile", get(environment::get_environment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    tracing::info!(%addr, "confd listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
