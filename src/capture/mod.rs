//! Captured actions and the capture filter.
//!
//! An [`Action`] is one normalized, replayable mutation instruction. Raw
//! records from the host pass through [`filter::ActionFilter`] before they
//! become actions.

pub mod filter;

use chrono::{DateTime, Utc};

/// One normalized action, with its position in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    text: String,
    seq: u64,
    captured_at: Option<DateTime<Utc>>,
}

impl Action {
    /// A freshly captured action, stamped with the current time.
    pub fn captured(text: impl Into<String>, seq: u64) -> Self {
        Self {
            text: text.into(),
            seq,
            captured_at: Some(Utc::now()),
        }
    }

    /// An action read back from a log artifact. Stored actions carry no
    /// timestamp.
    pub fn stored(text: impl Into<String>, seq: u64) -> Self {
        Self {
            text: text.into(),
            seq,
            captured_at: None,
        }
    }

    /// The action text, exactly as it is written to the log.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Zero-based position in the log artifact.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// When the action was captured, if it came from the live stream.
    #[must_use]
    pub const fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
