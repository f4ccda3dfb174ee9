//! The [`GitRepo`] trait, the single abstraction boundary between scenelog and git.
//!
//! The version store interacts with git exclusively through this trait. The
//! trait is object-safe so callers can hold a `Box<dyn GitRepo>`.
//!
//! | Group        | Methods                                              |
//! |--------------|------------------------------------------------------|
//! | Refs         | `read_ref`, `atomic_ref_update`, `list_refs`         |
//! | HEAD         | `head_target`, `set_head`                            |
//! | Rev-parse    | `rev_parse_opt`                                      |
//! | Object read  | `read_blob`, `read_tree`, `read_commit`              |
//! | Object write | `write_blob`, `write_tree`, `create_commit`          |
//! | Worktree     | `checkout_tree`, `reset_index`                       |
//! | Config       | `read_config`, `write_config`                        |

use std::path::Path;

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, RefEdit, RefName, TreeEntry};

/// The git abstraction trait used by the version store.
///
/// Implementations may be backed by gix (the shipped backend) or a test
/// double.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Refs
    //
    // Replaces: git rev-parse <ref>, git update-ref --stdin, git for-each-ref
    // -----------------------------------------------------------------------

    /// Resolve a ref to its OID, returning `None` if the ref does not exist.
    ///
    /// Replaces: `git rev-parse <ref>` (when used to resolve a known ref name).
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    /// Atomically apply a batch of ref updates with compare-and-swap semantics.
    ///
    /// All updates succeed or all fail. Each [`RefEdit`] carries an expected
    /// old OID; if any ref's current value differs, the entire transaction is
    /// aborted and [`GitError::RefConflict`] is returned.
    ///
    /// Replaces: `git update-ref --stdin` with `start`/`prepare`/`commit`.
    fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError>;

    /// List refs matching a prefix (e.g., `"refs/heads/"`).
    ///
    /// Returns `(ref_name, oid)` pairs in the order the backend enumerates
    /// them. The prefix is matched literally.
    ///
    /// Replaces: `git for-each-ref refs/some/prefix/`.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError>;

    // -----------------------------------------------------------------------
    // HEAD
    //
    // Replaces: git symbolic-ref HEAD, git symbolic-ref HEAD <ref>
    // -----------------------------------------------------------------------

    /// The ref HEAD points to symbolically, or `None` if HEAD is detached.
    ///
    /// The target may be unborn (no commit yet).
    fn head_target(&self) -> Result<Option<RefName>, GitError>;

    /// Point HEAD symbolically at `target`. The target need not exist yet.
    fn set_head(&self, target: &RefName) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Rev-parse
    // -----------------------------------------------------------------------

    /// Resolve a revision specification (including abbreviated hex ids) to an
    /// OID, returning `None` when it cannot be resolved.
    ///
    /// Replaces: `git rev-parse --verify -q <spec>`.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    //
    // Replaces: git cat-file blob, git ls-tree, git cat-file commit
    // -----------------------------------------------------------------------

    /// Read the raw contents of a blob object.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    /// Read the entries of a tree object (one level deep, not recursive).
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Read a commit object's metadata.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Object write
    //
    // Replaces: git hash-object -w, git mktree, git commit-tree
    // -----------------------------------------------------------------------

    /// Write a blob to the object store and return its OID.
    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError>;

    /// Write a tree object from a list of entries and return its OID.
    ///
    /// Entries are sorted into git order before writing.
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError>;

    /// Create a commit object authored by the configured identity and point
    /// `update_ref` at it.
    ///
    /// `update_ref` must currently point at the first parent (or not exist
    /// for a root commit); otherwise the commit is written but the ref update
    /// fails with an error.
    ///
    /// Replaces: `git commit-tree` + `git update-ref`.
    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: &RefName,
    ) -> Result<GitOid, GitError>;

    // -----------------------------------------------------------------------
    // Worktree
    //
    // Replaces: git checkout <oid> -- ., git read-tree <oid>
    // -----------------------------------------------------------------------

    /// Write every file of the tree at `oid` (a commit or a tree) into
    /// `workdir`, overwriting existing files. Files the current index tracks
    /// but the tree lacks are removed; untracked files are left alone.
    fn checkout_tree(&self, oid: GitOid, workdir: &Path) -> Result<(), GitError>;

    /// Replace the index with the contents of `tree`, leaving the working
    /// tree untouched.
    ///
    /// Replaces: `git read-tree <tree>`.
    fn reset_index(&self, tree: GitOid) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Config
    //
    // Replaces: git config <key>, git config <key> <value>
    // -----------------------------------------------------------------------

    /// Read a git config value. Returns `None` if the key is not set.
    fn read_config(&self, key: &str) -> Result<Option<String>, GitError>;

    /// Set a value in the repository-local config file.
    ///
    /// The value is visible to handles opened after the call; an already
    /// open handle keeps its config snapshot.
    fn write_config(&self, key: &str, value: &str) -> Result<(), GitError>;
}
