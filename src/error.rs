//! Error types for scenelog.
//!
//! One enum per component. Each variant carries enough context to render a
//! status line for the user without further lookups; the binary wraps them in
//! `anyhow` for top-level reporting.

use std::path::PathBuf;

use scenelog_git::{GitError, GitOid};
use thiserror::Error;

pub use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// DocumentError
// ---------------------------------------------------------------------------

/// An opaque failure reported by the host document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DocumentError {
    /// The host's description of the failure.
    pub message: String,
}

impl DocumentError {
    /// Wrap a host message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors returned by [`VersionStore`](crate::store::VersionStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No repository exists at the project root.
    #[error("not a scenelog project: no repository at {}", path.display())]
    NotARepository {
        /// The path that was opened.
        path: PathBuf,
    },

    /// `init` was called on a path that already holds a repository.
    #[error("a repository already exists at {}", path.display())]
    AlreadyInitialized {
        /// The project root.
        path: PathBuf,
    },

    /// `branch_create` was given a name that is already taken.
    #[error("branch '{name}' already exists")]
    DuplicateBranch {
        /// The branch name.
        name: String,
    },

    /// The named branch does not exist.
    #[error("branch '{name}' does not exist")]
    UnknownBranch {
        /// The branch name.
        name: String,
    },

    /// The commit id matched no commit (or matched more than one).
    #[error("unknown commit '{id}'")]
    UnknownCommit {
        /// The id as given by the caller.
        id: String,
    },

    /// The operation would discard unsaved or uncommitted actions.
    #[error("working state has {pending} uncommitted action(s); commit them or discard first")]
    DirtyWorkingState {
        /// Number of actions that would be lost.
        pending: usize,
    },

    /// The branch name would be rejected by git.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The commit identity cannot go into a commit signature.
    #[error("invalid identity {field} '{value}': {reason}")]
    InvalidIdentity {
        /// `name` or `email`.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A multi-step reset failed part-way through a revert. `at` is the
    /// commit HEAD resolves to after the failure, as read back from the
    /// repository.
    #[error("revert interrupted: HEAD is at {}: {reason}", at.map_or_else(|| "<unborn>".to_owned(), |oid| oid.short()))]
    RevertInterrupted {
        /// Where HEAD ended up.
        at: Option<GitOid>,
        /// The failure that stopped the revert.
        reason: String,
    },

    /// The git backend failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A working-tree file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// ReplayError
// ---------------------------------------------------------------------------

/// Errors returned by the replay engine.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The document could not be reset to its empty baseline.
    #[error("could not reset document before replay: {0}")]
    Reset(#[source] DocumentError),

    /// An action failed to execute. Actions before `index` have been applied;
    /// the document is left in that partial state.
    #[error("replay failed at action {index} `{action}`: {reason}")]
    ReplayFailure {
        /// Zero-based position of the failing action in the replayed log.
        index: usize,
        /// The action text.
        action: String,
        /// The document's failure message.
        reason: DocumentError,
    },
}

// ---------------------------------------------------------------------------
// LogError
// ---------------------------------------------------------------------------

/// Failures reading or writing the action log artifacts.
#[derive(Debug, Error)]
pub enum LogError {
    /// A log file could not be read, written, or synced.
    #[error("action log I/O on {}: {source}", path.display())]
    Io {
        /// The log file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A log file lacks the expected header line.
    #[error("{} is not an action log (missing header)", path.display())]
    MissingHeader {
        /// The log file.
        path: PathBuf,
    },

    /// A log file is not valid UTF-8.
    #[error("{} is not valid UTF-8", path.display())]
    Encoding {
        /// The log file.
        path: PathBuf,
    },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors returned by [`Session`](crate::session::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The version store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Replaying a log artifact failed.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// The project configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A log artifact could not be read or written.
    #[error(transparent)]
    Log(#[from] LogError),

    /// The document failed to persist an artifact. Nothing after the failed
    /// step ran.
    #[error("could not persist {artifact}: {reason}")]
    Persistence {
        /// Which artifact failed (`snapshot`, `config`, ...).
        artifact: &'static str,
        /// Why.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_interrupted_renders_short_head() {
        let oid: GitOid = "abcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
        let err = StoreError::RevertInterrupted {
            at: Some(oid),
            reason: "disk full".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "revert interrupted: HEAD is at abcdef0: disk full"
        );
    }

    #[test]
    fn replay_failure_names_index_and_action() {
        let err = ReplayError::ReplayFailure {
            index: 3,
            action: "bpy.ops.fail()".to_owned(),
            reason: DocumentError::new("unsupported"),
        };
        let msg = err.to_string();
        assert!(msg.contains("action 3"), "{msg}");
        assert!(msg.contains("bpy.ops.fail()"), "{msg}");
    }

    #[test]
    fn session_error_is_transparent_over_store() {
        let err = SessionError::from(StoreError::UnknownBranch {
            name: "feature".to_owned(),
        });
        assert_eq!(err.to_string(), "branch 'feature' does not exist");
    }
}
