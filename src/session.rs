//! Project lifecycle.
//!
//! A [`Session`] owns the live document and the in-memory tail of captured
//! actions, and sequences the action log, the version store and the replay
//! engine so the three never disagree:
//!
//! - snapshot before log: `save` persists the snapshot before appending the
//!   tail to the journal;
//! - seal, commit, clear: the journal is folded into the committed log right
//!   before a commit and emptied only once the commit exists;
//! - replay before capture: after a checkout or revert the document is
//!   rebuilt from the log before new actions are accepted.

use std::path::Path;

use scenelog_git::GitOid;
use tracing::instrument;

use crate::actionlog::{self, ActionLog};
use crate::capture::Action;
use crate::capture::filter::ActionFilter;
use crate::config::ProjectConfig;
use crate::document::Document;
use crate::error::{SessionError, StoreError};
use crate::layout::ProjectLayout;
use crate::replay::{self, ReplayReport};
use crate::store::{
    self, BranchInfo, CommitIter, HeadInfo, Identity, RevertOutcome, RevertState, VersionStore,
};

/// Message of the commit that completes [`Session::create`].
pub const CREATED_MESSAGE: &str = "Initial commit - created project";

/// Whether host records are being captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    /// Records are filtered into the tail.
    Capturing,
    /// A replay is rebuilding the document; records are dropped.
    Replaying,
    /// Capture is paused; records are dropped.
    Idle,
}

/// Snapshot of session state for status displays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStatus {
    pub branch: String,
    pub head: Option<GitOid>,
    pub state: CaptureState,
    /// Actions captured but not yet saved.
    pub unsaved: usize,
    /// Actions saved since the last commit.
    pub pending: usize,
}

/// An editing session over one project.
pub struct Session<D: Document> {
    document: D,
    layout: ProjectLayout,
    config: ProjectConfig,
    store: VersionStore,
    log: ActionLog,
    filter: ActionFilter,
    tail: Vec<Action>,
    state: CaptureState,
    executes: bool,
}

impl<D: Document> Session<D> {
    /// Create a new project at `root` with an empty document.
    ///
    /// Writes the configuration, an empty log, the repository with its
    /// initial commit, and the first snapshot, then commits
    /// [`CREATED_MESSAGE`].
    ///
    /// # Errors
    /// [`StoreError::AlreadyInitialized`] if `root` already is a project;
    /// otherwise any failure of the steps above.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn create(root: &Path, identity: Identity, mut document: D) -> Result<Self, SessionError> {
        if store::is_repository(root) {
            return Err(StoreError::AlreadyInitialized {
                path: root.to_owned(),
            }
            .into());
        }
        identity.validate()?;
        std::fs::create_dir_all(root).map_err(|e| persistence("project directory", &e))?;

        let config_path = ProjectLayout::config_path_for(root);
        let mut config = ProjectConfig::load(&config_path)?;
        config.identity.name.clone_from(&identity.name);
        config.identity.email.clone_from(&identity.email);
        // Pinned so a later open through another spelling of `root` finds the same artifacts.
        config.project.name = Some(config.artifact_name(root));
        config.save(&config_path)?;

        let layout = ProjectLayout::from_config(root, &config);
        let log = ActionLog::create(&layout)?;
        let mut store = VersionStore::init(&layout, &identity, &config.project.branch)?;

        document
            .reset_to_empty()
            .map_err(|e| persistence("document", &e))?;
        persist_document(&mut document, &layout)?;
        let head = store.commit(CREATED_MESSAGE)?;
        log.clear(&head.to_string())?;

        let filter = ActionFilter::new(config.filter.clone());
        tracing::info!(commit = %head.short(), "project created");
        Ok(Self {
            document,
            layout,
            config,
            store,
            log,
            filter,
            tail: Vec::new(),
            state: CaptureState::Capturing,
            executes: false,
        })
    }

    /// Open the project at `root` and rebuild `document` from its log.
    ///
    /// The committed log is restored from HEAD if it diverged (a crash
    /// between sealing and committing) and a journal left over from an
    /// earlier commit is discarded. HEAD's log is replayed, then the journal
    /// unless `replay.include_pending_on_open` is off.
    ///
    /// # Errors
    /// [`StoreError::NotARepository`] if `root` is not a project, or a
    /// config, log, replay or persistence failure.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn open(root: &Path, document: D) -> Result<Self, SessionError> {
        let config = ProjectConfig::load(&ProjectLayout::config_path_for(root))?;
        let layout = ProjectLayout::from_config(root, &config);
        let store = VersionStore::open(&layout)?;
        let log = ActionLog::open(&layout);
        let filter = ActionFilter::new(config.filter.clone());
        let mut session = Self {
            document,
            layout,
            config,
            store,
            log,
            filter,
            tail: Vec::new(),
            state: CaptureState::Idle,
            executes: false,
        };

        let head = session.store.head()?.commit.ok_or_else(|| StoreError::UnknownCommit {
            id: "HEAD".to_owned(),
        })?;
        let committed_text = session.store.read_log_at(head)?;
        if session.log.committed_text()? != committed_text {
            tracing::warn!(head = %head.short(), "working log diverged from HEAD; restoring");
            session.log.restore_committed(&committed_text)?;
        }

        session.discard_stale_journal()?;
        if !session.config.replay.include_pending_on_open {
            let dropped = session.log.pending_count()?;
            if dropped > 0 {
                tracing::warn!(dropped, "pending actions not replayed; discarding journal");
            }
            session.log.clear(&head.to_string())?;
        }

        let committed = actionlog::parse_actions(&committed_text, 0);
        let pending = session.log.read_pending()?;
        // read_pending numbers after the on-disk committed log, which now equals HEAD's.
        session.rebuild(&[&committed, &pending])?;
        tracing::info!(
            branch = %session.store.head()?.branch,
            committed = committed.len(),
            pending = pending.len(),
            "project opened"
        );
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Feed one raw host record. Returns how many actions it produced; always
    /// 0 unless the session is capturing.
    pub fn on_action(&mut self, raw: &str) -> usize {
        if self.state != CaptureState::Capturing {
            tracing::debug!(state = ?self.state, record = raw, "record dropped while not capturing");
            return 0;
        }
        let actions = self.filter.push(raw);
        self.accept(actions)
    }

    /// Whether accepted actions are also applied to the document.
    ///
    /// An editor has already executed what it reports, so this is off by
    /// default. A document that only changes through the session (such as
    /// [`HeadlessScene`](crate::scene::HeadlessScene)) turns it on; actions the
    /// document rejects are then not recorded.
    pub const fn set_executes_actions(&mut self, executes: bool) {
        self.executes = executes;
    }

    fn accept(&mut self, actions: Vec<Action>) -> usize {
        let mut accepted = 0;
        for action in actions {
            if self.executes
                && let Err(e) = self.document.apply_action(action.text())
            {
                tracing::warn!(action = action.text(), error = %e, "document rejected action; not recorded");
                continue;
            }
            self.tail.push(action);
            accepted += 1;
        }
        accepted
    }

    /// Persist the snapshot, then append the unsaved actions to the journal.
    /// Returns the number of actions appended.
    ///
    /// # Errors
    /// [`SessionError::Persistence`] if the snapshot cannot be written, in
    /// which case nothing is appended; [`SessionError::Log`] if the journal
    /// append fails.
    #[instrument(skip(self))]
    pub fn save(&mut self) -> Result<usize, SessionError> {
        let flushed = self.filter.finish();
        self.accept(flushed);
        self.persist_snapshot()?;
        let appended = self.log.append(&self.tail)?;
        self.tail.clear();
        Ok(appended)
    }

    /// Save, then commit the log and snapshot on the active branch.
    ///
    /// # Errors
    /// Any failure of [`save`](Self::save) or the store commit. HEAD stays at
    /// the previous commit if the commit was not created.
    #[instrument(skip(self))]
    pub fn commit(&mut self, message: &str) -> Result<GitOid, SessionError> {
        self.discard_stale_journal()?;
        self.save()?;
        if let Err(e) = self.log.seal() {
            self.unseal();
            return Err(e.into());
        }
        let oid = match self.store.commit(message) {
            Ok(oid) => oid,
            Err(e) => {
                self.unseal();
                return Err(e.into());
            }
        };
        if let Err(e) = self.log.clear(&oid.to_string()) {
            // The journal still names the parent as its base, so the next
            // commit or open discards it instead of sealing it twice.
            self.state = CaptureState::Idle;
            tracing::warn!(commit = %oid.short(), error = %e, "journal not cleared; capture paused");
            return Err(e.into());
        }
        Ok(oid)
    }

    /// Empty a journal whose base is not HEAD: its actions are already part
    /// of a commit or belong to another branch.
    fn discard_stale_journal(&self) -> Result<(), SessionError> {
        let Some(head) = self.store.head()?.commit else {
            return Ok(());
        };
        let head_hex = head.to_string();
        if let Some(base) = self.log.pending_base()?
            && base != head_hex
        {
            tracing::warn!(%base, head = %head.short(), "journal predates HEAD; discarding");
            self.log.clear(&head_hex)?;
        }
        Ok(())
    }

    /// Put the committed log back to HEAD's after a failed seal or commit.
    fn unseal(&self) {
        let restored = self
            .store
            .head()
            .ok()
            .and_then(|head| head.commit)
            .map(|head| {
                self.store
                    .read_log_at(head)
                    .map_err(SessionError::from)
                    .and_then(|text| Ok(self.log.restore_committed(&text)?))
            });
        if let Some(Err(e)) = restored {
            tracing::warn!(error = %e, "could not restore committed log after failed commit");
        }
    }

    // -----------------------------------------------------------------------
    // Branches and history
    // -----------------------------------------------------------------------

    /// Create a branch at HEAD. The active branch does not change.
    ///
    /// # Errors
    /// See [`VersionStore::branch_create`].
    pub fn create_branch(&mut self, name: &str) -> Result<BranchInfo, SessionError> {
        Ok(self.store.branch_create(name)?)
    }

    /// All branches, flagging the active one.
    ///
    /// # Errors
    /// See [`VersionStore::branch_list`].
    pub fn branches(&self) -> Result<Vec<BranchInfo>, SessionError> {
        Ok(self.store.branch_list()?)
    }

    /// Commits of `branch`, most recent first.
    ///
    /// # Errors
    /// See [`VersionStore::list_commits`].
    pub fn commits(&self, branch: &str) -> Result<CommitIter<'_>, SessionError> {
        Ok(self.store.list_commits(branch)?)
    }

    /// The active branch and commit.
    ///
    /// # Errors
    /// See [`VersionStore::head`].
    pub fn head(&self) -> Result<HeadInfo, SessionError> {
        Ok(self.store.head()?)
    }

    /// Switch to `name` and rebuild the document from its log.
    ///
    /// # Errors
    /// [`StoreError::DirtyWorkingState`] if there are unsaved or uncommitted
    /// actions and `discard` is false; [`StoreError::UnknownBranch`]; or a
    /// replay failure, after which the session stays idle.
    #[instrument(skip(self))]
    pub fn checkout(&mut self, name: &str, discard: bool) -> Result<ReplayReport, SessionError> {
        let dirty = self.dirty_count()?;
        if dirty > 0 && !discard {
            return Err(StoreError::DirtyWorkingState { pending: dirty }.into());
        }
        if dirty > 0 {
            tracing::warn!(discarded = dirty, "discarding uncommitted actions");
        }

        let tip = self.store.checkout(name)?;
        self.state = CaptureState::Idle;
        self.tail.clear();
        self.log.clear(&tip.to_string())?;
        let committed = actionlog::parse_actions(&self.store.read_log_at(tip)?, 0);
        self.rebuild(&[&committed])
    }

    /// Revert to commit `id` (full or abbreviated) and rebuild the document.
    ///
    /// Pending work is saved first; the reset then discards the journal.
    /// Returns `None` when `id` already is HEAD.
    ///
    /// # Errors
    /// [`StoreError::UnknownCommit`]; [`StoreError::RevertInterrupted`], after
    /// which the session is idle until the project is reopened; or a replay
    /// failure, after which the session stays idle.
    #[instrument(skip(self))]
    pub fn revert_to(&mut self, id: &str) -> Result<Option<RevertOutcome>, SessionError> {
        self.save()?;
        let outcome = match self.store.revert_to(id) {
            Ok(outcome) => outcome,
            Err(e @ StoreError::RevertInterrupted { .. }) => {
                // The document no longer matches whatever HEAD the store ended at.
                self.state = CaptureState::Idle;
                tracing::warn!(error = %e, "capture paused; reopen the project to resume");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let RevertOutcome::Reverted { commit, .. } = outcome else {
            return Ok(None);
        };

        self.state = CaptureState::Idle;
        let dropped = self.log.pending_count()?;
        if dropped > 0 {
            tracing::warn!(dropped, "revert discarded uncommitted actions");
        }
        self.log.clear(&commit.to_string())?;
        let committed = actionlog::parse_actions(&self.store.read_log_at(commit)?, 0);
        self.rebuild(&[&committed])?;
        tracing::info!(state = ?RevertState::Clean, commit = %commit.short(), "revert complete");
        Ok(Some(outcome))
    }

    /// Branch, HEAD and counts of not-yet-committed actions.
    ///
    /// # Errors
    /// Returns an error if HEAD or the journal cannot be read.
    pub fn status(&self) -> Result<SessionStatus, SessionError> {
        let head = self.store.head()?;
        Ok(SessionStatus {
            branch: head.branch,
            head: head.commit,
            state: self.state,
            unsaved: self.tail.len() + usize::from(self.filter.has_held()),
            pending: self.log.pending_count()?,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    #[must_use]
    pub const fn document(&self) -> &D {
        &self.document
    }

    #[must_use]
    pub const fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &VersionStore {
        &self.store
    }

    /// The committed log followed by the pending journal, as on disk.
    ///
    /// # Errors
    /// Returns [`SessionError::Log`] if either file cannot be read.
    pub fn saved_actions(&self) -> Result<Vec<Action>, SessionError> {
        let mut actions = self.log.read_committed()?;
        actions.extend(self.log.read_pending()?);
        Ok(actions)
    }

    /// End the session, handing back the document.
    pub fn into_document(self) -> D {
        self.document
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn dirty_count(&self) -> Result<usize, SessionError> {
        Ok(self.tail.len() + usize::from(self.filter.has_held()) + self.log.pending_count()?)
    }

    fn persist_snapshot(&mut self) -> Result<(), SessionError> {
        persist_document(&mut self.document, &self.layout)
    }

    /// Replay `segments`, re-persist the snapshot and resume capture. On
    /// failure the session stays idle.
    fn rebuild(&mut self, segments: &[&[Action]]) -> Result<ReplayReport, SessionError> {
        self.state = CaptureState::Replaying;
        let report = match replay::replay_segments(&mut self.document, segments) {
            Ok(report) => report,
            Err(e) => {
                self.state = CaptureState::Idle;
                return Err(e.into());
            }
        };
        if let Err(e) = self.persist_snapshot() {
            self.state = CaptureState::Idle;
            return Err(e);
        }
        self.tail.clear();
        self.filter.reset(report.executed as u64);
        self.state = CaptureState::Capturing;
        Ok(report)
    }
}

/// Persist `document` to the layout's snapshot path and check that the
/// document reports it there.
fn persist_document<D: Document>(
    document: &mut D,
    layout: &ProjectLayout,
) -> Result<(), SessionError> {
    let expected = layout.snapshot_path();
    document
        .persist_snapshot(&expected)
        .map_err(|e| persistence("snapshot", &e))?;
    match document.snapshot_path() {
        Some(actual) if actual != expected => Err(persistence(
            "snapshot",
            &format!("written to {} instead of {}", actual.display(), expected.display()),
        )),
        _ => Ok(()),
    }
}

fn persistence(artifact: &'static str, reason: &dyn std::fmt::Display) -> SessionError {
    SessionError::Persistence {
        artifact,
        reason: reason.to_string(),
    }
}
