//! `GitEnvironmentRepository`: the per-repository orchestrator tying
//! together the factory, credentials, synchronizer and branch manager
//! into one refresh state machine.
//!
//! A per-repository mutex serializes concurrent requests; the debounce
//! clock is stamped before the fetch runs, not after. Everything below
//! that mutex runs on a blocking thread (`tokio::task::spawn_blocking`)
//! since libgit2 and filesystem I/O are both synchronous.

use std::path::PathBuf;
use std::sync::Arc;

use crate::environment::EnvironmentAssembler;
use crate::error::ConfdResult;

use super::credentials::CredentialsProvider;
use super::{BranchManager, GitFactory, Libgit2Factory, RepoContext, RepositoryCloner, Synchronizer};

/// What a caller needs to materialise an environment: the resolved
/// application/profile/label, the commit the working copy is pinned
/// to, and the ordered directories to search for property files.
#[derive(Debug, Clone)]
pub struct Locations {
    pub application: String,
    pub profile: String,
    pub label: String,
    pub version: String,
    pub search_paths: Vec<PathBuf>,
}

/// Debounce bookkeeping for one repository. `last_refresh_ms == 0` means
/// "never attempted a fetch".
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncState {
    pub last_refresh_ms: i64,
}

pub struct GitEnvironmentRepository {
    ctx: RepoContext,
    factory: Arc<dyn GitFactory>,
    state: tokio::sync::Mutex<SyncState>,
}

impl GitEnvironmentRepository {
    pub fn new(ctx: RepoContext) -> Arc<GitEnvironmentRepository> {
        Arc::new(Self::with_factory(ctx, Arc::new(Libgit2Factory)))
    }

    pub fn with_factory(ctx: RepoContext, factory: Arc<dyn GitFactory>) -> GitEnvironmentRepository {
        GitEnvironmentRepository {
            ctx,
            factory,
            state: tokio::sync::Mutex::new(SyncState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.ctx.name
    }

    /// Resolve the working directory, commit, and property-file search
    /// path for `application`/`profile` at `label`. `label` of `None`
    /// means the configured default label.
    pub async fn get_locations(
        &self,
        application: &str,
        profile: &str,
        label: Option<&str>,
    ) -> ConfdResult<Locations> {
        let label = label.unwrap_or(&self.ctx.config.default_label).to_string();

        let (resolved_label, version, working_directory) = match self.refresh(&label).await {
            Ok(result) => result,
            Err(err) if self.should_retry_master(&label) => {
                self.refresh("master").await.map_err(|_| err)?
            }
            Err(err) => return Err(err),
        };

        let search_paths = EnvironmentAssembler::search_locations(
            &working_directory,
            application,
            profile,
            &resolved_label,
        );

        Ok(Locations {
            application: application.to_string(),
            profile: profile.to_string(),
            label: resolved_label,
            version,
            search_paths,
        })
    }

    fn should_retry_master(&self, label: &str) -> bool {
        self.ctx.config.try_master_fallback
            && label == "main"
            && self.ctx.config.default_label == "main"
    }

    /// Bring the working copy up to date for `label`, returning the
    /// label actually checked out, the resolved `HEAD` SHA, and the
    /// working directory. Holds the per-repository lock for the whole
    /// operation, so two concurrent requests for the same repository
    /// serialize rather than race on the same checkout.
    async fn refresh(&self, label: &str) -> ConfdResult<(String, String, PathBuf)> {
        let mut guard = self.state.lock().await;
        let ctx = self.ctx.clone();
        let factory = self.factory.clone();
        let label = label.to_string();
        let snapshot = *guard;

        let (result, new_state) = tokio::task::spawn_blocking(move || {
            Self::refresh_blocking(&ctx, factory.as_ref(), &label, snapshot)
        })
        .await
        .map_err(|e| anyhow::anyhow!("refresh task panicked: {e}"))??;

        *guard = new_state;
        Ok(result)
    }

    fn refresh_blocking(
        ctx: &RepoContext,
        factory: &dyn GitFactory,
        label: &str,
        mut state: SyncState,
    ) -> ConfdResult<((String, String, PathBuf), SyncState)> {
        let dir = RepositoryCloner::file_uri_path(ctx.uri()).unwrap_or_else(|| ctx.working_directory());
        remove_stale_index_lock(&dir);

        let creds = CredentialsProvider::resolve(ctx.uri(), &ctx.config);

        // On-demand bring-up happens independent of `clone_on_start`,
        // which only governs an eager clone at startup.
        let repo = if RepositoryCloner::already_cloned(&dir) {
            factory.open(&dir)?
        } else {
            RepositoryCloner::clone_fresh(ctx, factory, &creds)?
        };

        if Synchronizer::should_pull(ctx, &repo, &state)? {
            // Stamp before the fetch runs: a fetch that fails still
            // consumes this debounce window.
            Synchronizer::stamp_refresh(&mut state);

            match Synchronizer::fetch(ctx, &repo, &creds) {
                Ok(()) => {
                    if ctx.config.delete_untracked_branches {
                        BranchManager::delete_untracked_local_branches(ctx, &repo)?;
                    }
                }
                Err(err) => {
                    ctx.warn(format!("fetch failed, serving last known state: {err}"));
                }
            }
        }

        // Checkout and merge run regardless of whether the fetch above
        // succeeded: a stale remote view is still a consistent one.
        BranchManager::checkout(ctx, &repo, label)?;

        if !BranchManager::is_tag(&repo, label) {
            // A tag is a fixed point; nothing to fast-forward onto.
            Synchronizer::try_merge(ctx, &repo, label)?;
        }

        let head = repo.head()?.peel_to_commit()?;
        let version = head.id().to_string();

        Ok(((label.to_string(), version, dir), state))
    }
}

fn remove_stale_index_lock(working_directory: &std::path::Path) {
    let lock = working_directory.join(".git").join("index.lock");
    if lock.exists() {
        if let Err(err) = std::fs::remove_file(&lock) {
            tracing::warn!(path = %lock.display(), %err, "failed to remove stale index.lock");
        }
    }
}
