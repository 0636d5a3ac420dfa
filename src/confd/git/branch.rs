//! Resolves a label to a concrete commit and moves the working tree
//! there, and prunes branches the remote no longer has. The caller's
//! label isn't known to be a branch, tag, or raw revision ahead of
//! time, so each candidate form is tried in turn and the first that
//! resolves wins.

use git2::build::CheckoutBuilder;
use git2::{BranchType, ObjectType, Oid, Repository};

use crate::error::{ConfdError, ConfdResult};

use super::RepoContext;

pub struct BranchManager;

impl BranchManager {
    /// Move `repo`'s `HEAD` and working tree onto `label`, trying, in
    /// order: an existing local branch, a remote-tracking branch
    /// (`origin/<label>`), a tag, and finally a raw revision (commit
    /// SHA). The first candidate that resolves wins; none resolving is
    /// `NoSuchLabel`.
    pub fn checkout(ctx: &RepoContext, repo: &Repository, label: &str) -> ConfdResult<()> {
        if let Some(oid) = Self::resolve(repo, label) {
            return Self::checkout_oid(repo, label, oid);
        }
        Err(ConfdError::from_git(
            git2::Error::from_str("no matching ref"),
            label,
            ctx.uri(),
        )
        .into())
    }

    fn resolve(repo: &Repository, label: &str) -> Option<Oid> {
        if let Ok(branch) = repo.find_branch(label, BranchType::Local) {
            if let Some(target) = branch.get().target() {
                return Some(target);
            }
        }
        if let Ok(branch) = repo.find_branch(&format!("origin/{label}"), BranchType::Remote) {
            if let Some(target) = branch.get().target() {
                return Some(target);
            }
        }
        if let Ok(reference) = repo.find_reference(&format!("refs/tags/{label}")) {
            if let Some(target) = reference.target() {
                return Some(target);
            }
        }
        if let Ok(object) = repo.revparse_single(label) {
            return Some(object.id());
        }
        None
    }

    fn checkout_oid(repo: &Repository, label: &str, oid: Oid) -> ConfdResult<()> {
        let commit = repo.find_commit(oid)?;
        let tree = commit.tree()?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(tree.as_object(), Some(&mut checkout))?;

        // A local branch of this name exists and tracks either itself or
        // the remote counterpart: stay on it (attached HEAD) so a later
        // fast-forward merge has somewhere to land. Otherwise detach.
        if repo.find_branch(label, BranchType::Local).is_ok() {
            repo.set_head(&format!("refs/heads/{label}"))?;
        } else if let Ok(remote_branch) = repo.find_branch(&format!("origin/{label}"), BranchType::Remote) {
            let target = remote_branch
                .get()
                .target()
                .ok_or_else(|| git2::Error::from_str("remote branch has no target"))?;
            let commit = repo.find_commit(target)?;
            repo.branch(label, &commit, false)?;
            repo.reference(
                &format!("refs/heads/{label}"),
                target,
                true,
                "set up remote tracking branch",
            )?;
            let mut branch = repo.find_branch(label, BranchType::Local)?;
            branch.set_upstream(Some(&format!("origin/{label}")))?;
            repo.set_head(&format!("refs/heads/{label}"))?;
        } else {
            repo.set_head_detached(oid)?;
        }

        Ok(())
    }

    /// Remove local branches with no corresponding `origin/<name>`
    /// branch, skipping whichever branch `HEAD` currently points at.
    pub fn delete_untracked_local_branches(ctx: &RepoContext, repo: &Repository) -> ConfdResult<()> {
        if !ctx.config.delete_untracked_branches {
            return Ok(());
        }

        let current = repo
            .head()
            .ok()
            .and_then(|h| h.shorthand().map(str::to_string));

        let mut stale = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let name = match branch.name()? {
                Some(name) => name.to_string(),
                None => continue,
            };
            if Some(&name) == current.as_ref() {
                continue;
            }
            if repo
                .find_branch(&format!("origin/{name}"), BranchType::Remote)
                .is_err()
            {
                stale.push(name);
            }
        }

        for name in stale {
            if let Ok(mut branch) = repo.find_branch(&name, BranchType::Local) {
                if let Err(err) = branch.delete() {
                    ctx.warn(format!("failed to delete untracked branch `{name}`: {err}"));
                }
            }
        }

        Ok(())
    }

    /// True if `label` names a lightweight or annotated tag rather than
    /// a branch. A tag is a fixed point in history and is never merged
    /// into, so the orchestrator uses this to skip the fast-forward
    /// step entirely for a tagged checkout.
    pub fn is_tag(repo: &Repository, label: &str) -> bool {
        repo.find_reference(&format!("refs/tags/{label}"))
            .map(|r| r.peel(ObjectType::Any).is_ok())
            .unwrap_or(false)
    }
}
