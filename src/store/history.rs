//! Commit history walking.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use scenelog_git::{CommitInfo, GitOid, GitRepo};

use crate::error::StoreError;

/// Date format of [`CommitRecord::date`] (`Sun Jul  8 00:34:60 2001 +0200`).
pub const DATE_FORMAT: &str = "%c %z";

/// A commit as presented to the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: GitOid,
    pub short_id: String,
    pub author: String,
    pub email: String,
    /// Author time in the author's offset, formatted with [`DATE_FORMAT`].
    pub date: String,
    /// Author time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Message with surrounding whitespace removed.
    pub message: String,
    pub parent: Option<GitOid>,
    pub tree: GitOid,
}

impl CommitRecord {
    pub(crate) fn from_info(id: GitOid, info: CommitInfo) -> Self {
        let date = FixedOffset::east_opt(info.offset_seconds)
            .and_then(|offset| offset.timestamp_opt(info.time_seconds, 0).single())
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        Self {
            id,
            short_id: id.short(),
            author: info.author_name,
            email: info.author_email,
            date,
            timestamp: info.time_seconds,
            message: info.message.trim_matches([' ', '\t', '\n', '\r']).to_owned(),
            parent: info.parents.first().copied(),
            tree: info.tree_oid,
        }
    }

    /// The author time in UTC.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// How long ago the commit was made, relative to `now`: `now`, `12 sec`,
    /// `1 min`, `5 mins`, `1 hr`, `3 hrs`, `1 day`, `9 days`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> String {
        age_label(now.timestamp() - self.timestamp)
    }
}

fn age_label(elapsed_secs: i64) -> String {
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match elapsed_secs {
        ..=0 => "now".to_owned(),
        s if s < 60 => format!("{s} sec"),
        s if s < 3600 => plural(s / 60, "min"),
        s if s < 86_400 => plural(s / 3600, "hr"),
        s => plural(s / 86_400, "day"),
    }
}

/// Lazy walk from a commit to the root along first parents, most recent
/// first. Yields each commit once; stops after the first error.
pub struct CommitIter<'a> {
    repo: &'a dyn GitRepo,
    next: Option<GitOid>,
}

impl<'a> CommitIter<'a> {
    pub(crate) fn new(repo: &'a dyn GitRepo, tip: Option<GitOid>) -> Self {
        Self { repo, next: tip }
    }
}

impl Iterator for CommitIter<'_> {
    type Item = Result<CommitRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.repo.read_commit(id) {
            Ok(info) => {
                let record = CommitRecord::from_info(id, info);
                self.next = record.parent;
                Some(Ok(record))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl std::iter::FusedIterator for CommitIter<'_> {}
