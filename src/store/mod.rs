//! The git-backed version store.
//!
//! [`VersionStore`] owns the repository, its commits and branches. It knows
//! which files of the project are tracked (the ignore marker, the committed
//! log and the snapshot) and builds every commit tree from exactly those
//! files, so the log and snapshot always travel together.
//!
//! All git access goes through the [`GitRepo`] trait from `scenelog-git`.

mod branch;
mod history;
mod revert;

use std::path::Path;

use scenelog_git::{GitError, GitOid, GitRepo, GixRepo, RefEdit, RefName, TreeEntry};
use tracing::instrument;

pub use branch::{BranchInfo, BranchName};
pub use history::{CommitIter, CommitRecord, DATE_FORMAT};
pub use revert::{RevertOutcome, RevertState, revert_message};

use crate::actionlog;
use crate::config::IdentityConfig;
use crate::error::StoreError;
use crate::layout::ProjectLayout;

/// Message of the commit created by [`VersionStore::init`].
pub const INITIAL_COMMIT_MESSAGE: &str = "initial commit";

/// The author identity stamped on commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Identity {
    /// Check that both fields fit in a commit signature line.
    ///
    /// # Errors
    /// [`StoreError::InvalidIdentity`] for an empty field, a control
    /// character, or an angle bracket.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (field, value) in [("name", &self.name), ("email", &self.email)] {
            let reason = if value.trim().is_empty() {
                Some("must not be empty")
            } else if value.chars().any(char::is_control) {
                Some("must not contain control characters")
            } else if value.contains(['<', '>']) {
                Some("must not contain '<' or '>'")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(StoreError::InvalidIdentity {
                    field,
                    value: value.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

impl Default for Identity {
    fn default() -> Self {
        IdentityConfig::default().into()
    }
}

impl From<IdentityConfig> for Identity {
    fn from(config: IdentityConfig) -> Self {
        Self::new(config.name, config.email)
    }
}

/// The active branch and the commit it points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadInfo {
    pub branch: String,
    /// `None` only for a branch with no commits yet.
    pub commit: Option<GitOid>,
}

/// Commit history, branches and HEAD of one project.
pub struct VersionStore {
    repo: Box<dyn GitRepo>,
    layout: ProjectLayout,
}

impl VersionStore {
    /// Create a repository at the project root and make the first commit.
    ///
    /// Writes the identity into the repository config, writes the ignore
    /// marker if absent, points HEAD at `branch` and commits whatever tracked
    /// artifacts exist with the message [`INITIAL_COMMIT_MESSAGE`].
    ///
    /// # Errors
    /// [`StoreError::AlreadyInitialized`] if a repository exists at the root,
    /// [`StoreError::InvalidIdentity`], [`StoreError::InvalidBranchName`] for
    /// a bad `branch`, or a backend or I/O failure.
    #[instrument(skip_all, fields(root = %layout.root().display(), branch = %branch))]
    pub fn init(
        layout: &ProjectLayout,
        identity: &Identity,
        branch: &str,
    ) -> Result<Self, StoreError> {
        let root = layout.root();
        if root.join(".git").exists() {
            return Err(StoreError::AlreadyInitialized {
                path: root.to_owned(),
            });
        }
        identity.validate()?;
        let branch = BranchName::new(branch)?.to_ref()?;
        std::fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;

        let repo = GixRepo::init(root)?;
        write_identity(&repo, identity)?;
        let repo = repo.reopen()?;

        let ignore = layout.ignore_path();
        if ignore.exists() {
            tracing::debug!(path = %ignore.display(), "keeping existing ignore marker");
        } else {
            std::fs::write(&ignore, layout.ignore_marker())
                .map_err(|e| StoreError::io(&ignore, e))?;
        }

        repo.set_head(&branch)?;
        let mut store = Self {
            repo: Box::new(repo),
            layout: layout.clone(),
        };
        store.commit(INITIAL_COMMIT_MESSAGE)?;
        tracing::info!("repository initialized");
        Ok(store)
    }

    /// Open the repository at the project root.
    ///
    /// A missing commit identity is not fatal: it is logged and the default
    /// identity is written.
    ///
    /// # Errors
    /// [`StoreError::NotARepository`] if there is no repository at the root.
    #[instrument(skip_all, fields(root = %layout.root().display()))]
    pub fn open(layout: &ProjectLayout) -> Result<Self, StoreError> {
        let root = layout.root();
        let not_a_repo = || StoreError::NotARepository {
            path: root.to_owned(),
        };
        if !root.join(".git").is_dir() {
            return Err(not_a_repo());
        }
        let mut repo = GixRepo::open(root).map_err(|e| {
            tracing::debug!(error = %e, "open failed");
            not_a_repo()
        })?;

        let name = repo.read_config("user.name")?;
        let email = repo.read_config("user.email")?;
        if name.is_none() || email.is_none() {
            let defaults = Identity::default();
            tracing::warn!(
                name = %defaults.name,
                email = %defaults.email,
                "ConfigurationError: commit identity not configured, writing defaults"
            );
            let identity = Identity::new(
                name.unwrap_or(defaults.name),
                email.unwrap_or(defaults.email),
            );
            write_identity(&repo, &identity)?;
            repo = repo.reopen()?;
        }

        Ok(Self {
            repo: Box::new(repo),
            layout: layout.clone(),
        })
    }

    #[must_use]
    pub const fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// The identity commits are authored with.
    ///
    /// # Errors
    /// Returns [`StoreError::Git`] if the config cannot be read.
    pub fn identity(&self) -> Result<Identity, StoreError> {
        let defaults = Identity::default();
        Ok(Identity::new(
            self.repo.read_config("user.name")?.unwrap_or(defaults.name),
            self.repo.read_config("user.email")?.unwrap_or(defaults.email),
        ))
    }

    // -----------------------------------------------------------------------
    // HEAD
    // -----------------------------------------------------------------------

    /// The active branch and its commit.
    ///
    /// # Errors
    /// Returns [`StoreError::Git`] if HEAD is detached or unreadable.
    pub fn head(&self) -> Result<HeadInfo, StoreError> {
        let target = self.active_ref()?;
        let branch = target.branch_name().unwrap_or(target.as_str()).to_owned();
        Ok(HeadInfo {
            branch,
            commit: self.repo.read_ref(&target)?,
        })
    }

    fn active_ref(&self) -> Result<RefName, StoreError> {
        self.repo.head_target()?.ok_or_else(|| {
            StoreError::Git(GitError::NotFound {
                message: "HEAD is detached; check out a branch".to_owned(),
            })
        })
    }

    fn head_commit(&self) -> Result<GitOid, StoreError> {
        self.head()?.commit.ok_or_else(|| StoreError::UnknownCommit {
            id: "HEAD".to_owned(),
        })
    }

    // -----------------------------------------------------------------------
    // Commits
    // -----------------------------------------------------------------------

    /// Commit the tracked artifacts of the working tree on the active branch.
    /// A tree identical to HEAD's still produces a new commit.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if a tracked file cannot be read, or
    /// [`StoreError::Git`] if the commit cannot be written.
    #[instrument(skip(self))]
    pub fn commit(&mut self, message: &str) -> Result<GitOid, StoreError> {
        let target = self.active_ref()?;
        let parent = self.repo.read_ref(&target)?;
        let tree = self.stage_tracked()?;
        let parents: Vec<GitOid> = parent.into_iter().collect();
        let oid = self.repo.create_commit(tree, &parents, message, &target)?;
        self.repo.reset_index(tree)?;
        tracing::info!(commit = %oid.short(), branch = target.branch_name(), "committed");
        Ok(oid)
    }

    /// Write blobs for every tracked file present in the working tree and a
    /// tree holding them.
    fn stage_tracked(&self) -> Result<GitOid, StoreError> {
        let mut entries = Vec::new();
        for name in self.layout.tracked_files() {
            let path = self.layout.root().join(&name);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let oid = self.repo.write_blob(&bytes)?;
                    entries.push(TreeEntry::blob(name, oid));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(file = %name, "tracked file absent, not staged");
                }
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }
        Ok(self.repo.write_tree(&entries)?)
    }

    /// Resolve a full or abbreviated (at least 4 hex digits) commit id.
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownCommit`] if `id` is not hex, too short,
    /// ambiguous, or names no commit.
    pub fn resolve_commit(&self, id: &str) -> Result<GitOid, StoreError> {
        let unknown = || StoreError::UnknownCommit { id: id.to_owned() };
        let id_trimmed = id.trim();
        if !(4..=40).contains(&id_trimmed.len())
            || !id_trimmed.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(unknown());
        }
        let oid = self.repo.rev_parse_opt(id_trimmed)?.ok_or_else(unknown)?;
        self.repo.read_commit(oid).map_err(|_| unknown())?;
        Ok(oid)
    }

    /// Metadata of one commit.
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownCommit`] if `id` is not a commit.
    pub fn commit_record(&self, id: GitOid) -> Result<CommitRecord, StoreError> {
        let info = self
            .repo
            .read_commit(id)
            .map_err(|_| StoreError::UnknownCommit { id: id.to_string() })?;
        Ok(CommitRecord::from_info(id, info))
    }

    /// Commits reachable from `branch`, most recent first, ending at the
    /// initial commit.
    ///
    /// # Errors
    /// [`StoreError::UnknownBranch`] if the branch does not exist.
    pub fn list_commits(&self, branch: &str) -> Result<CommitIter<'_>, StoreError> {
        let tip = self.branch_tip(branch)?;
        Ok(CommitIter::new(self.repo.as_ref(), Some(tip)))
    }

    /// The committed log text stored in `commit`. A commit without a log
    /// holds the empty log.
    ///
    /// # Errors
    /// [`StoreError::UnknownCommit`] if `commit` is not a commit, or
    /// [`StoreError::Git`] if the log blob is unreadable.
    pub fn read_log_at(&self, commit: GitOid) -> Result<String, StoreError> {
        let name = self.layout.log_file_name();
        match self.read_file_at(commit, &name)? {
            Some(bytes) => String::from_utf8(bytes).map_err(|_| {
                StoreError::Git(GitError::BackendError {
                    message: format!("{name} in commit {} is not UTF-8", commit.short()),
                })
            }),
            None => Ok(actionlog::empty_log()),
        }
    }

    /// Raw content of the tracked file `name` in `commit`, if present.
    ///
    /// # Errors
    /// [`StoreError::UnknownCommit`] if `commit` is not a commit.
    pub fn read_file_at(&self, commit: GitOid, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let tree = self.commit_record(commit)?.tree;
        let entry = self.repo.read_tree(tree)?.into_iter().find(|e| e.name == name);
        entry
            .map(|e| self.repo.read_blob(e.oid).map_err(StoreError::from))
            .transpose()
    }

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    /// Create `name` at HEAD's commit. HEAD does not move.
    ///
    /// # Errors
    /// [`StoreError::InvalidBranchName`], [`StoreError::DuplicateBranch`], or
    /// [`StoreError::UnknownCommit`] if HEAD has no commit yet.
    #[instrument(skip(self))]
    pub fn branch_create(&mut self, name: &str) -> Result<BranchInfo, StoreError> {
        let branch = BranchName::new(name)?;
        let target = branch.to_ref()?;
        let duplicate = || StoreError::DuplicateBranch {
            name: name.to_owned(),
        };
        if self.repo.read_ref(&target)?.is_some() {
            return Err(duplicate());
        }
        let head = self.head_commit()?;
        self.repo
            .atomic_ref_update(&[RefEdit {
                name: target,
                new_oid: head,
                expected_old_oid: GitOid::ZERO,
            }])
            .map_err(|e| match e {
                GitError::RefConflict { .. } => duplicate(),
                other => StoreError::Git(other),
            })?;
        tracing::info!(branch = name, at = %head.short(), "branch created");
        Ok(BranchInfo {
            name: name.to_owned(),
            is_active: false,
        })
    }

    /// Every branch, flagging the active one, in backend enumeration order.
    ///
    /// # Errors
    /// Returns [`StoreError::Git`] if refs cannot be listed.
    pub fn branch_list(&self) -> Result<Vec<BranchInfo>, StoreError> {
        let active = self.repo.head_target()?;
        Ok(self
            .repo
            .list_refs("refs/heads/")?
            .into_iter()
            .filter_map(|(name, _)| {
                let is_active = active.as_ref() == Some(&name);
                name.branch_name().map(|branch| BranchInfo {
                    name: branch.to_owned(),
                    is_active,
                })
            })
            .collect())
    }

    fn branch_tip(&self, name: &str) -> Result<GitOid, StoreError> {
        let unknown = || StoreError::UnknownBranch {
            name: name.to_owned(),
        };
        let target = BranchName::new(name).map_err(|_| unknown())?.to_ref()?;
        self.repo.read_ref(&target)?.ok_or_else(unknown)
    }

    /// Make `name` the active branch and write its tree into the working tree.
    ///
    /// Refusing to discard unsaved work is the caller's job; this overwrites
    /// the tracked files unconditionally.
    ///
    /// # Errors
    /// [`StoreError::UnknownBranch`] if the branch does not exist.
    #[instrument(skip(self))]
    pub fn checkout(&mut self, name: &str) -> Result<GitOid, StoreError> {
        let tip = self.branch_tip(name)?;
        let target = BranchName::new(name)?.to_ref()?;
        self.materialize(tip)?;
        self.repo.set_head(&target)?;
        tracing::info!(branch = name, at = %tip.short(), "checked out");
        Ok(tip)
    }

    /// Write the tracked files of `commit` into the working tree and the
    /// index. Tracked files the commit does not contain are deleted by the
    /// checkout, since every commit leaves the index at its tree.
    fn materialize(&self, commit: GitOid) -> Result<GitOid, StoreError> {
        let tree = self.commit_record(commit)?.tree;
        self.repo.checkout_tree(tree, self.layout.root())?;
        self.repo.reset_index(tree)?;
        Ok(tree)
    }
}

fn write_identity(repo: &GixRepo, identity: &Identity) -> Result<(), StoreError> {
    repo.write_config("user.name", &identity.name)?;
    repo.write_config("user.email", &identity.email)?;
    Ok(())
}

/// Whether `root` holds a repository.
#[must_use]
pub fn is_repository(root: &Path) -> bool {
    root.join(".git").is_dir()
}
