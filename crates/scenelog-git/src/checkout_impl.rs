//! gix-backed worktree materialization and index reset.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use gix::bstr::ByteSlice;

use crate::error::GitError;
use crate::gix_repo::{GixRepo, from_gix_oid, to_gix_oid};
use crate::types::GitOid;

/// Resolve `oid` to a tree: commits are peeled to their tree, trees pass through.
fn resolve_tree(repo: &GixRepo, oid: GitOid) -> Result<GitOid, GitError> {
    let obj = repo
        .repo
        .find_object(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("object {oid}: {e}"),
        })?;
    match obj.kind {
        gix::object::Kind::Commit => {
            let commit = obj.into_commit();
            let tree = commit.tree_id().map_err(|e| GitError::BackendError {
                message: format!("failed to get tree from commit {oid}: {e}"),
            })?;
            Ok(from_gix_oid(&tree.detach()))
        }
        gix::object::Kind::Tree => Ok(oid),
        other => Err(GitError::BackendError {
            message: format!("expected commit or tree, got {other}"),
        }),
    }
}

pub fn checkout_tree(repo: &GixRepo, oid: GitOid, workdir: &Path) -> Result<(), GitError> {
    let tree = resolve_tree(repo, oid)?;
    let mut index_file = repo
        .repo
        .index_from_tree(&to_gix_oid(tree))
        .map_err(|e| GitError::BackendError {
            message: format!("failed to create index from tree {tree}: {e}"),
        })?;
    let target_paths = index_paths(&index_file);
    let previously_tracked = match repo.repo.try_index().map_err(GitError::backend)? {
        Some(index) => index_paths(&index),
        None => HashSet::new(),
    };

    let mut opts = repo
        .repo
        .checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to get checkout options: {e}"),
        })?;
    opts.overwrite_existing = true;
    opts.destination_is_initially_empty = false;

    let objects = repo
        .repo
        .objects
        .clone()
        .into_arc()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to share object store: {e}"),
        })?;

    let outcome = gix::worktree::state::checkout(
        &mut index_file,
        workdir,
        objects,
        &gix::progress::Discard,
        &gix::progress::Discard,
        &AtomicBool::new(false),
        opts,
    )
    .map_err(|e| GitError::BackendError {
        message: format!("checkout failed: {e}"),
    })?;
    if let Some(first) = outcome.errors.first() {
        return Err(GitError::BackendError {
            message: format!(
                "checkout had {} error(s), first: {}: {}",
                outcome.errors.len(),
                first.path,
                first.error,
            ),
        });
    }

    remove_untargeted(workdir, previously_tracked.difference(&target_paths))?;
    tracing::debug!(%tree, workdir = %workdir.display(), "tree materialized");
    Ok(())
}

fn index_paths(index: &gix::index::State) -> HashSet<String> {
    index
        .entries()
        .iter()
        .filter_map(|entry| entry.path(index).to_str().ok().map(str::to_owned))
        .collect()
}

/// Delete files the current index tracks but the checked-out tree lacks.
/// Untracked files are never touched.
fn remove_untargeted<'a>(
    workdir: &Path,
    stale: impl Iterator<Item = &'a String>,
) -> Result<(), GitError> {
    for rel in stale {
        let path = workdir.join(rel);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(file = %rel, "removed file absent from target tree"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GitError::BackendError {
                    message: format!("failed to remove stale file '{rel}': {e}"),
                });
            }
        }
        if let Some(parent) = path.parent().filter(|p| *p != workdir) {
            // Succeeds only once the directory is empty.
            let _ = std::fs::remove_dir(parent);
        }
    }
    Ok(())
}

pub fn reset_index(repo: &GixRepo, tree: GitOid) -> Result<(), GitError> {
    let tree = resolve_tree(repo, tree)?;
    let mut index_file = repo
        .repo
        .index_from_tree(&to_gix_oid(tree))
        .map_err(|e| GitError::BackendError {
            message: format!("failed to create index from tree {tree}: {e}"),
        })?;
    index_file
        .write(Default::default())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to write index: {e}"),
        })?;
    Ok(())
}
