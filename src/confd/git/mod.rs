//! The git environment repository subsystem.
//!
//! Wired together with a small capability struct (`RepoContext`) instead
//! of back-references: `BranchManager`, `Synchronizer` and
//! `RepositoryCloner` each take a `&RepoContext` rather than holding a
//! pointer back to the orchestrating `GitEnvironmentRepository`.

mod branch;
mod cloner;
mod factory;
mod repository;
mod sync;

pub mod credentials;

pub use branch::BranchManager;
pub use cloner::RepositoryCloner;
pub use factory::{GitFactory, Libgit2Factory};
pub use repository::{GitEnvironmentRepository, Locations, SyncState};
pub use sync::Synchronizer;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RepositoryConfig;

/// The read-only facts every git component needs: where the repo lives,
/// and how it's configured. Cheap to clone (an `Arc` around the config).
#[derive(Clone)]
pub struct RepoContext {
    pub name: String,
    pub config: Arc<RepositoryConfig>,
}

impl RepoContext {
    pub fn new(name: impl Into<String>, config: Arc<RepositoryConfig>) -> RepoContext {
        RepoContext {
            name: name.into(),
            config,
        }
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn working_directory(&self) -> PathBuf {
        self.config.working_directory().to_path_buf()
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        tracing::warn!(repo = %self.name, %message, "git");
    }
}
