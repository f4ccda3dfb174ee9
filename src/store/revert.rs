//! Non-destructive revert.
//!
//! Reverting to T from HEAD H never rewrites history. The store
//!
//! 1. hard-resets to T: T's tree goes into the working tree and index, and
//!    the active branch moves to T;
//! 2. soft-resets back to H: the branch returns to H, the working tree and
//!    index stay at T;
//! 3. commits T's tree on top of H as `Reverted to commit: <short id>`.
//!
//! Every commit between T and H stays reachable. If a step fails part-way
//! the store reads HEAD back, writes that commit's files into the working
//! tree again, and reports where it is.

use scenelog_git::{GitOid, RefEdit, RefName};
use tracing::instrument;

use super::VersionStore;
use crate::error::StoreError;

/// Phases of a revert, as reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevertState {
    Clean,
    Reverting,
    Replaying,
    Failed,
}

/// Result of [`VersionStore::revert_to`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevertOutcome {
    /// The target already is HEAD; nothing changed.
    Cancelled,
    /// A revert commit was created on top of the previous HEAD.
    Reverted {
        /// The new revert commit.
        commit: GitOid,
        /// The commit whose state was restored.
        target: GitOid,
        /// HEAD before the revert, now the revert commit's parent.
        previous_head: GitOid,
    },
}

/// Message of the commit created by a revert to `target`.
#[must_use]
pub fn revert_message(target: GitOid) -> String {
    format!("Reverted to commit: {}", target.short())
}

impl VersionStore {
    /// Restore the state of commit `id` as a new commit on the active branch.
    ///
    /// The working tree holds the target's tracked files afterwards; the
    /// caller replays the log to rebuild the live document.
    ///
    /// # Errors
    /// [`StoreError::UnknownCommit`] if `id` does not resolve, or
    /// [`StoreError::RevertInterrupted`] if the reset sequence failed part-way.
    #[instrument(skip(self))]
    pub fn revert_to(&mut self, id: &str) -> Result<RevertOutcome, StoreError> {
        let target = self.resolve_commit(id)?;
        let branch = self.active_ref()?;
        let head = self.head_commit()?;
        if target == head {
            tracing::info!(state = ?RevertState::Clean, "revert target is HEAD; cancelled");
            return Ok(RevertOutcome::Cancelled);
        }
        tracing::info!(
            state = ?RevertState::Reverting,
            target = %target.short(),
            head = %head.short(),
            "reverting"
        );

        let tree = self
            .hard_reset(&branch, head, target)
            .map_err(|e| self.interrupted(&e))?;
        self.move_branch(&branch, target, head)
            .map_err(|e| self.interrupted(&e))?;
        tracing::debug!(branch = %branch, "soft reset back to previous head");

        let commit = self
            .repo
            .create_commit(tree, &[head], &revert_message(target), &branch)
            .map_err(|e| self.interrupted(&StoreError::from(e)))?;
        self.repo
            .reset_index(tree)
            .map_err(|e| self.interrupted(&StoreError::from(e)))?;

        tracing::info!(
            state = ?RevertState::Replaying,
            commit = %commit.short(),
            "revert committed"
        );
        Ok(RevertOutcome::Reverted {
            commit,
            target,
            previous_head: head,
        })
    }

    fn hard_reset(
        &self,
        branch: &RefName,
        head: GitOid,
        target: GitOid,
    ) -> Result<GitOid, StoreError> {
        let tree = self.materialize(target)?;
        self.move_branch(branch, head, target)?;
        tracing::debug!(branch = %branch, to = %target.short(), "hard reset");
        Ok(tree)
    }

    fn move_branch(&self, branch: &RefName, from: GitOid, to: GitOid) -> Result<(), StoreError> {
        self.repo.atomic_ref_update(&[RefEdit {
            name: branch.clone(),
            new_oid: to,
            expected_old_oid: from,
        }])?;
        Ok(())
    }

    fn interrupted(&self, cause: &StoreError) -> StoreError {
        let at = self.repo.rev_parse_opt("HEAD").ok().flatten();
        tracing::warn!(
            state = ?RevertState::Failed,
            at = ?at.map(|oid| oid.short()),
            error = %cause,
            "revert interrupted"
        );
        if let Some(at) = at
            && let Err(e) = self.materialize(at)
        {
            tracing::error!(at = %at.short(), error = %e, "could not restore working tree");
        }
        StoreError::RevertInterrupted {
            at,
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use scenelog_git::{CommitInfo, GitError, GitRepo, GixRepo, TreeEntry};

    use super::*;
    use crate::layout::ProjectLayout;
    use crate::store::Identity;

    /// Delegates to gix but refuses to create commits.
    struct NoCommits(GixRepo);

    impl GitRepo for NoCommits {
        fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
            self.0.read_ref(name)
        }
        fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError> {
            self.0.atomic_ref_update(edits)
        }
        fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
            self.0.list_refs(prefix)
        }
        fn head_target(&self) -> Result<Option<RefName>, GitError> {
            self.0.head_target()
        }
        fn set_head(&self, target: &RefName) -> Result<(), GitError> {
            self.0.set_head(target)
        }
        fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
            self.0.rev_parse_opt(spec)
        }
        fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
            self.0.read_blob(oid)
        }
        fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
            self.0.read_tree(oid)
        }
        fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
            self.0.read_commit(oid)
        }
        fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError> {
            self.0.write_blob(data)
        }
        fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
            self.0.write_tree(entries)
        }
        fn create_commit(
            &self,
            _tree: GitOid,
            _parents: &[GitOid],
            _message: &str,
            _update_ref: &RefName,
        ) -> Result<GitOid, GitError> {
            Err(GitError::BackendError {
                message: "object database is read-only".to_owned(),
            })
        }
        fn checkout_tree(&self, oid: GitOid, workdir: &Path) -> Result<(), GitError> {
            self.0.checkout_tree(oid, workdir)
        }
        fn reset_index(&self, tree: GitOid) -> Result<(), GitError> {
            self.0.reset_index(tree)
        }
        fn read_config(&self, key: &str) -> Result<Option<String>, GitError> {
            self.0.read_config(key)
        }
        fn write_config(&self, key: &str, value: &str) -> Result<(), GitError> {
            self.0.write_config(key, value)
        }
    }

    #[test]
    fn failed_revert_commit_restores_head_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scene");
        let layout = ProjectLayout::new(&root, "scene", "blend");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(layout.log_path(), "# scenelog action log v1\n").unwrap();
        let mut store = VersionStore::init(&layout, &Identity::default(), "main").unwrap();
        let first = store.head().unwrap().commit.unwrap();
        let head_log = "# scenelog action log v1\nbpy.ops.mesh.primitive_cube_add()\n";
        std::fs::write(layout.log_path(), head_log).unwrap();
        std::fs::write(layout.snapshot_path(), b"{}").unwrap();
        let head = store.commit("cube").unwrap();

        store.repo = Box::new(NoCommits(GixRepo::open(&root).unwrap()));
        let err = store.revert_to(&first.to_string()).unwrap_err();

        match err {
            StoreError::RevertInterrupted { at, reason } => {
                assert_eq!(at, Some(head));
                assert!(reason.contains("read-only"), "{reason}");
            }
            other => panic!("expected RevertInterrupted, got {other}"),
        }
        assert_eq!(std::fs::read_to_string(layout.log_path()).unwrap(), head_log);
        assert!(layout.snapshot_path().is_file());
        assert_eq!(store.head().unwrap().commit, Some(head));
    }

    #[test]
    fn message_uses_seven_char_id() {
        let oid: GitOid = "0123456789abcdef0123456789abcdef01234567".parse().unwrap();
        assert_eq!(revert_message(oid), "Reverted to commit: 0123456");
    }
}
