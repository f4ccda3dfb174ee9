//! The action log artifact.
//!
//! A project's log is kept in two files:
//!
//! - the committed log (`<name>.actions`), tracked in every commit and
//!   cumulative since the project was created;
//! - the pending journal (`.scenelog/pending.actions`), untracked, holding
//!   the actions saved since the last commit.
//!
//! [`ActionLog::append`] writes to the journal. Right before a commit,
//! [`ActionLog::seal`] copies the journal onto the committed log so the commit
//! captures it; once the commit is durable, [`ActionLog::clear`] empties the
//! journal and records the new commit as its base. A journal whose base is not
//! HEAD was already committed (or abandoned) and is discarded on open.

mod read;
mod write;

use std::path::PathBuf;

use tracing::instrument;

use crate::capture::Action;
use crate::error::LogError;
use crate::layout::ProjectLayout;

pub use read::parse_actions;

/// First line of every log file.
pub const HEADER: &str = "# scenelog action log v1";

/// Comment recording the commit a pending journal was started from.
pub const BASE_PREFIX: &str = "# base ";

/// Handle on the committed log and pending journal of one project.
#[derive(Clone, Debug)]
pub struct ActionLog {
    committed: PathBuf,
    pending: PathBuf,
}

impl ActionLog {
    /// Write an empty committed log and an empty journal.
    ///
    /// # Errors
    /// Returns [`LogError::Io`] if either file cannot be written.
    #[instrument(skip_all, fields(root = %layout.root().display()))]
    pub fn create(layout: &ProjectLayout) -> Result<Self, LogError> {
        let log = Self::open(layout);
        write::replace_file(&log.committed, &empty_log())?;
        write::replace_file(&log.pending, &empty_log())?;
        tracing::debug!("action log created");
        Ok(log)
    }

    /// Handle on an existing project's log. Files are read lazily.
    #[must_use]
    pub fn open(layout: &ProjectLayout) -> Self {
        Self {
            committed: layout.log_path(),
            pending: layout.pending_path(),
        }
    }

    /// Append `actions` to the pending journal in order, flushed and synced
    /// before returning. Returns the number of lines written.
    ///
    /// The caller must have persisted the snapshot first.
    ///
    /// # Errors
    /// Returns [`LogError::Io`] if the write or sync fails.
    pub fn append(&self, actions: &[Action]) -> Result<usize, LogError> {
        let written = write::append_lines(&self.pending, HEADER, actions.iter().map(Action::text))?;
        tracing::debug!(written, "actions appended to journal");
        Ok(written)
    }

    /// Copy the journal's actions onto the end of the committed log and sync
    /// it. The journal itself is left in place until [`clear`](Self::clear).
    ///
    /// # Errors
    /// Returns [`LogError`] if either file cannot be read or written.
    #[instrument(skip(self))]
    pub fn seal(&self) -> Result<usize, LogError> {
        let pending = self.read_pending_texts()?;
        let sealed = write::append_lines(
            &self.committed,
            HEADER,
            pending.iter().map(String::as_str),
        )?;
        tracing::debug!(sealed, "journal sealed into committed log");
        Ok(sealed)
    }

    /// Empty the journal and record `base` as the commit it now extends.
    ///
    /// # Errors
    /// Returns [`LogError::Io`] if the journal cannot be rewritten.
    pub fn clear(&self, base: &str) -> Result<(), LogError> {
        write::replace_file(&self.pending, &format!("{HEADER}\n{BASE_PREFIX}{base}\n"))?;
        tracing::debug!(base, "journal cleared");
        Ok(())
    }

    /// The committed log's actions, numbered from 0.
    ///
    /// # Errors
    /// Returns [`LogError`] if the file cannot be read.
    pub fn read_committed(&self) -> Result<Vec<Action>, LogError> {
        Ok(parse_actions(&read::read_log_file(&self.committed)?, 0))
    }

    /// The journal's actions, numbered after the committed log.
    ///
    /// # Errors
    /// Returns [`LogError`] if either file cannot be read.
    pub fn read_pending(&self) -> Result<Vec<Action>, LogError> {
        let offset = self.read_committed()?.len() as u64;
        Ok(parse_actions(&read::read_log_file(&self.pending)?, offset))
    }

    /// Number of actions in the journal.
    ///
    /// # Errors
    /// Returns [`LogError`] if the journal cannot be read.
    pub fn pending_count(&self) -> Result<usize, LogError> {
        Ok(self.read_pending_texts()?.len())
    }

    /// The commit the journal was started from, if recorded.
    ///
    /// # Errors
    /// Returns [`LogError`] if the journal cannot be read.
    pub fn pending_base(&self) -> Result<Option<String>, LogError> {
        let text = read::read_log_file(&self.pending)?;
        Ok(read::parse_base(&text).map(str::to_owned))
    }

    /// Raw text of the committed log as it is on disk.
    ///
    /// # Errors
    /// Returns [`LogError`] if the file cannot be read.
    pub fn committed_text(&self) -> Result<String, LogError> {
        read::read_log_file(&self.committed)
    }

    /// Overwrite the committed log with `text`, as stored in a commit.
    ///
    /// # Errors
    /// Returns [`LogError::Io`] if the file cannot be written.
    pub fn restore_committed(&self, text: &str) -> Result<(), LogError> {
        write::replace_file(&self.committed, text)
    }

    #[must_use]
    pub fn committed_path(&self) -> &std::path::Path {
        &self.committed
    }

    #[must_use]
    pub fn pending_path(&self) -> &std::path::Path {
        &self.pending
    }

    fn read_pending_texts(&self) -> Result<Vec<String>, LogError> {
        let text = read::read_log_file(&self.pending)?;
        Ok(parse_actions(&text, 0)
            .into_iter()
            .map(|a| a.text().to_owned())
            .collect())
    }
}

/// Text of a log holding no actions.
#[must_use]
pub fn empty_log() -> String {
    format!("{HEADER}\n")
}

/// Render actions as the text of a committed log.
pub fn render_log<'a, I>(actions: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut text = empty_log();
    for action in actions {
        text.push_str(action);
        text.push('\n');
    }
    text
}
