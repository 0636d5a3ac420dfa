//! First-time bring-up of a repository's working copy: wipe the
//! basedir, clone fresh, and optionally recurse into submodules. One
//! working copy lives per configured repository. A `file:` URI is a
//! special case: the remote *is* the working tree, so it's opened in
//! place rather than copied.

use std::path::{Path, PathBuf};

use git2::Repository;

use crate::error::ConfdResult;
use crate::util::{self, ToUrl};

use super::credentials::Credentials;
use super::{GitFactory, RepoContext};

pub struct RepositoryCloner;

impl RepositoryCloner {
    /// Bring up a working copy for `ctx`. A `file:` URI is opened in
    /// place; any other scheme gets `basedir` wiped and a fresh clone.
    /// Submodules are recursed into when `config.clone_submodules` is
    /// set (and a clone actually happened).
    pub fn clone_fresh(
        ctx: &RepoContext,
        factory: &dyn GitFactory,
        creds: &Credentials,
    ) -> ConfdResult<Repository> {
        if let Some(source) = Self::file_uri_path(ctx.uri()) {
            if !source.join(".git").is_dir() {
                anyhow::bail!(
                    "`{}` is not a git working directory (no `.git` found)",
                    source.display()
                );
            }
            return factory.open(&source);
        }

        let dir = ctx.working_directory();
        util::remove_dir_all(&dir)?;
        util::create_dir_all(&dir)?;

        let repo = factory.clone(ctx.uri(), &dir, creds)?;

        if ctx.config.clone_submodules {
            Self::update_submodules(&repo)?;
        }

        Ok(repo)
    }

    /// If `uri` is a `file:` URI, the local directory it names.
    pub fn file_uri_path(uri: &str) -> Option<PathBuf> {
        let url = uri.to_url().ok()?;
        if url.scheme() != "file" {
            return None;
        }
        url.to_file_path().ok()
    }

    fn update_submodules(repo: &Repository) -> ConfdResult<()> {
        for mut submodule in repo.submodules()? {
            submodule.update(true, None)?;
        }
        Ok(())
    }

    /// True if `dir` already looks like a checked-out working copy.
    pub fn already_cloned(dir: &Path) -> bool {
        Repository::open(dir).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_uri_path_recognises_file_scheme() {
        let path = RepositoryCloner::file_uri_path("file:///srv/repos/config").unwrap();
        assert_eq!(path, PathBuf::from("/srv/repos/config"));
    }

    #[test]
    fn file_uri_path_rejects_other_schemes() {
        assert!(RepositoryCloner::file_uri_path("https://example.invalid/repo.git").is_none());
        assert!(RepositoryCloner::file_uri_path("ssh://git@example.invalid/repo.git").is_none());
        assert!(RepositoryCloner::file_uri_path("not a url").is_none());
    }
}
