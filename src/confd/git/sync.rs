//! Fetch/merge/reset mechanics plus the dirty-tree and debounce checks
//! that gate them.

use std::time::{SystemTime, UNIX_EPOCH};

use git2::{AutotagOption, FetchOptions, Repository, ResetType, StatusOptions, Statuses};

use crate::error::ConfdResult;
use crate::util;

use super::credentials::{Credentials, CredentialsProvider};
use super::{RepoContext, SyncState};

pub struct Synchronizer;

impl Synchronizer {
    /// 1. `refresh_rate_seconds < 0` -> never pull.
    /// 2. `refresh_rate_seconds > 0` and the debounce window hasn't
    ///    elapsed -> don't pull yet.
    /// 3. Read `git status`; on a corrupt-index failure ("Short read of
    ///    block.") with `force_pull` set, delete `.git/index`, reset
    ///    hard to `HEAD`, and re-read status.
    /// 4. `clean = status.is_empty()`, `has_origin = origin has a URL`.
    /// 5. `force_pull && !clean` -> log the dirty paths and pull anyway.
    /// 6. Otherwise pull only if `clean && has_origin`.
    pub fn should_pull(ctx: &RepoContext, repo: &Repository, state: &SyncState) -> ConfdResult<bool> {
        let rate = ctx.config.refresh_rate_seconds;
        if rate < 0 {
            return Ok(false);
        }
        if rate > 0 {
            let elapsed = now_ms().saturating_sub(state.last_refresh_ms);
            if elapsed < rate * 1000 {
                return Ok(false);
            }
        }

        let statuses = match read_statuses(repo) {
            Ok(statuses) => statuses,
            Err(err) if ctx.config.force_pull && is_corrupt_index(&err) => {
                recover_corrupt_index(repo)?;
                read_statuses(repo)?
            }
            Err(err) => return Err(err.into()),
        };

        let clean = statuses.is_empty();
        let has_origin = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(str::to_string))
            .map(|url| !url.is_empty())
            .unwrap_or(false);

        if ctx.config.force_pull && !clean {
            log_dirty_paths(ctx, &statuses);
            return Ok(true);
        }

        Ok(clean && has_origin)
    }

    pub fn stamp_refresh(state: &mut SyncState) {
        state.last_refresh_ms = now_ms();
    }

    /// Fetch `origin`, fast-forwarding remote-tracking refs. No retry: a
    /// failed fetch propagates to the caller, who still stamped the
    /// debounce clock before calling this.
    pub fn fetch(_ctx: &RepoContext, repo: &Repository, creds: &Credentials) -> ConfdResult<()> {
        let mut remote = repo.find_remote("origin")?;

        let mut callbacks = git2::RemoteCallbacks::new();
        CredentialsProvider::configure(creds, &mut callbacks);

        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(callbacks)
            .download_tags(AutotagOption::All);

        remote.fetch(&[] as &[&str], Some(&mut fetch_options), None)?;
        Ok(())
    }

    /// If `label` names a local branch, merge `origin/<label>` onto it
    /// (fast-forwarding when possible, logging rather than failing on a
    /// non-fast-forward divergence), then, regardless of how the merge
    /// went, reset hard to `origin/<label>` if the tree is left dirty or
    /// ahead of the remote. Reset failures are logged and swallowed.
    pub fn try_merge(ctx: &RepoContext, repo: &Repository, label: &str) -> ConfdResult<()> {
        let remote_ref = match repo.find_reference(&format!("refs/remotes/origin/{label}")) {
            Ok(r) => r,
            Err(_) => return Ok(()),
        };
        let remote_oid = remote_ref
            .target()
            .ok_or_else(|| git2::Error::from_str("origin ref has no target"))?;
        let annotated = repo.find_annotated_commit(remote_oid)?;

        let (analysis, _) = repo.merge_analysis(&[&annotated])?;
        if analysis.is_up_to_date() {
            // nothing to merge
        } else if analysis.is_fast_forward() {
            let mut local_ref = repo.find_reference(&format!("refs/heads/{label}"))?;
            local_ref.set_target(remote_oid, "fast-forward merge")?;
            repo.set_head(&format!("refs/heads/{label}"))?;

            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.force();
            repo.checkout_head(Some(&mut checkout))?;
        } else {
            ctx.warn(format!(
                "merge of origin/{label} was not a fast-forward; local history has diverged"
            ));
        }

        if !is_clean(repo, label)? {
            if let Err(err) = reset_hard(repo, label) {
                ctx.warn(format!("reset to origin/{label} failed: {err}"));
            }
        }

        Ok(())
    }
}

fn read_statuses(repo: &Repository) -> Result<Statuses<'_>, git2::Error> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(false).include_ignored(false);
    repo.statuses(Some(&mut opts))
}

fn is_corrupt_index(err: &git2::Error) -> bool {
    err.message().contains("Short read of block.")
}

fn recover_corrupt_index(repo: &Repository) -> ConfdResult<()> {
    let index_path = repo.path().join("index");
    util::remove_file(&index_path)?;
    let head = repo.head()?.peel_to_commit()?;
    repo.reset(head.as_object(), ResetType::Hard, None)?;
    Ok(())
}

fn log_dirty_paths(ctx: &RepoContext, statuses: &Statuses<'_>) {
    let paths: Vec<&str> = statuses.iter().filter_map(|entry| entry.path()).collect();
    ctx.warn(format!("force-pull over dirty tree: {}", paths.join(", ")));
}

/// Clean means: no modified/new/deleted entries in the index or
/// working tree, AND `label` is not ahead of `origin/<label>`. A branch
/// with no upstream configured reports a null tracking status, which
/// counts as "not ahead". Any failure reading status is treated as
/// dirty.
fn is_clean(repo: &Repository, label: &str) -> ConfdResult<bool> {
    let statuses = match read_statuses(repo) {
        Ok(statuses) => statuses,
        Err(_) => return Ok(false),
    };
    if !statuses.is_empty() {
        return Ok(false);
    }

    match repo.find_branch(label, git2::BranchType::Local) {
        Ok(branch) => match branch_ahead_behind(repo, &branch) {
            Ok((ahead, _behind)) => Ok(ahead == 0),
            Err(_) => Ok(true),
        },
        Err(_) => Ok(false),
    }
}

/// `git reset --hard origin/<label>`: discard local modifications and
/// diverging commits by landing the branch back on the remote tip.
fn reset_hard(repo: &Repository, label: &str) -> ConfdResult<()> {
    let remote_ref = repo.find_reference(&format!("refs/remotes/origin/{label}"))?;
    let target = remote_ref
        .target()
        .ok_or_else(|| git2::Error::from_str("origin ref has no target"))?;
    let commit = repo.find_commit(target)?;
    repo.reset(commit.as_object(), ResetType::Hard, None)?;
    tracing::info!(oid = %target, "reset hard to origin");
    Ok(())
}

fn branch_ahead_behind(repo: &Repository, branch: &git2::Branch) -> ConfdResult<(usize, usize)> {
    let local = branch
        .get()
        .target()
        .ok_or_else(|| git2::Error::from_str("branch has no target"))?;
    let upstream = branch.upstream()?;
    let remote = upstream
        .get()
        .target()
        .ok_or_else(|| git2::Error::from_str("upstream has no target"))?;
    Ok(repo.graph_ahead_behind(local, remote)?)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use git2::Signature;
    use tempfile::TempDir;

    use super::*;
    use crate::config::RepositoryConfig;

    fn base_config() -> RepositoryConfig {
        RepositoryConfig {
            uri: String::new(),
            basedir: PathBuf::from("/tmp"),
            working_directory: None,
            default_label: "main".into(),
            try_master_fallback: true,
            timeout_seconds: 5,
            refresh_rate_seconds: -1,
            clone_on_start: true,
            force_pull: false,
            delete_untracked_branches: false,
            skip_ssl_validation: false,
            clone_submodules: false,
            username: None,
            password: None,
            passphrase: None,
        }
    }

    fn init_repo(dir: &std::path::Path, origin_url: Option<&str>) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "tester").unwrap();
            config.set_str("user.email", "tester@example.invalid").unwrap();
        }
        if let Some(url) = origin_url {
            repo.remote("origin", url).unwrap();
        }
        std::fs::write(dir.join("app.properties"), "a=1\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(std::path::Path::new("app.properties")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("tester", "tester@example.invalid").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        repo
    }

    #[test]
    fn negative_refresh_rate_never_pulls() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), Some("file:///nonexistent"));

        let mut config = base_config();
        config.refresh_rate_seconds = -1;
        let ctx = RepoContext::new("default", Arc::new(config));

        let state = SyncState { last_refresh_ms: 0 };
        assert!(!Synchronizer::should_pull(&ctx, &repo, &state).unwrap());
    }

    #[test]
    fn clean_tree_with_origin_pulls() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), Some("file:///nonexistent"));

        let mut config = base_config();
        config.refresh_rate_seconds = 0;
        let ctx = RepoContext::new("default", Arc::new(config));

        let state = SyncState { last_refresh_ms: 0 };
        assert!(Synchronizer::should_pull(&ctx, &repo, &state).unwrap());
    }

    #[test]
    fn dirty_tree_without_force_pull_does_not_pull() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), Some("file:///nonexistent"));
        std::fs::write(dir.path().join("app.properties"), "a=DIRTY\n").unwrap();

        let mut config = base_config();
        config.refresh_rate_seconds = 0;
        config.force_pull = false;
        let ctx = RepoContext::new("default", Arc::new(config));

        let state = SyncState { last_refresh_ms: 0 };
        assert!(!Synchronizer::should_pull(&ctx, &repo, &state).unwrap());
    }

    #[test]
    fn dirty_tree_with_force_pull_still_pulls() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), Some("file:///nonexistent"));
        std::fs::write(dir.path().join("app.properties"), "a=DIRTY\n").unwrap();

        let mut config = base_config();
        config.refresh_rate_seconds = 0;
        config.force_pull = true;
        let ctx = RepoContext::new("default", Arc::new(config));

        let state = SyncState { last_refresh_ms: 0 };
        assert!(Synchronizer::should_pull(&ctx, &repo, &state).unwrap());
    }

    #[test]
    fn clean_tree_without_origin_does_not_pull() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(dir.path(), None);

        let mut config = base_config();
        config.refresh_rate_seconds = 0;
        let ctx = RepoContext::new("default", Arc::new(config));

        let state = SyncState { last_refresh_ms: 0 };
        assert!(!Synchronizer::should_pull(&ctx, &repo, &state).unwrap());
    }
}
