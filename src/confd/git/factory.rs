//! Seam between the orchestrator and libgit2: open an existing working
//! copy, or clone a fresh one.

use std::path::Path;

use git2::build::RepoBuilder;
use git2::{FetchOptions, Repository};

use crate::error::{ConfdResult, ConfdResultExt};

use super::credentials::{Credentials, CredentialsProvider};

/// Abstracts repository construction so the orchestrator never calls
/// libgit2 directly; swappable in tests for a fake that never touches
/// the filesystem.
pub trait GitFactory: Send + Sync {
    fn open(&self, dir: &Path) -> ConfdResult<Repository>;

    fn clone(&self, uri: &str, into: &Path, creds: &Credentials) -> ConfdResult<Repository>;
}

pub struct Libgit2Factory;

impl GitFactory for Libgit2Factory {
    fn open(&self, dir: &Path) -> ConfdResult<Repository> {
        Repository::open(dir).chain_err(|| format!("failed to open repository at `{}`", dir.display()))
    }

    fn clone(&self, uri: &str, into: &Path, creds: &Credentials) -> ConfdResult<Repository> {
        let mut callbacks = git2::RemoteCallbacks::new();
        CredentialsProvider::configure(creds, &mut callbacks);

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(uri, into)
            .chain_err(|| format!("failed to clone `{uri}` into `{}`", into.display()))
    }
}
