//! The host document collaborator.
//!
//! The session never inspects document state directly; it drives it through
//! [`Document`]. [`DisplayGuard`] puts a document into non-interactive mode
//! for the duration of a replay and restores the previous mode when dropped.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::error::DocumentError;

/// How the host presents the document while actions execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Normal interactive editing.
    #[default]
    Interactive,
    /// No redraws or UI feedback; used while replaying.
    Headless,
}

/// A mutable document that can execute actions and persist snapshots.
pub trait Document {
    /// Execute one action against the current state.
    ///
    /// # Errors
    /// Returns [`DocumentError`] if the action is not understood or fails.
    fn apply_action(&mut self, action: &str) -> Result<(), DocumentError>;

    /// Discard all state, returning to the empty baseline replay starts from.
    ///
    /// # Errors
    /// Returns [`DocumentError`] if the host cannot reset.
    fn reset_to_empty(&mut self) -> Result<(), DocumentError>;

    /// Durably write a full snapshot of the current state to `path`.
    ///
    /// # Errors
    /// Returns [`DocumentError`] if the snapshot cannot be written.
    fn persist_snapshot(&mut self, path: &Path) -> Result<(), DocumentError>;

    /// Where the document was last persisted, if anywhere.
    fn snapshot_path(&self) -> Option<PathBuf>;

    /// Switch display mode, returning the previous one.
    fn set_display_mode(&mut self, mode: DisplayMode) -> DisplayMode;
}

impl<D: Document + ?Sized> Document for &mut D {
    fn apply_action(&mut self, action: &str) -> Result<(), DocumentError> {
        (**self).apply_action(action)
    }

    fn reset_to_empty(&mut self) -> Result<(), DocumentError> {
        (**self).reset_to_empty()
    }

    fn persist_snapshot(&mut self, path: &Path) -> Result<(), DocumentError> {
        (**self).persist_snapshot(path)
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        (**self).snapshot_path()
    }

    fn set_display_mode(&mut self, mode: DisplayMode) -> DisplayMode {
        (**self).set_display_mode(mode)
    }
}

impl<D: Document + ?Sized> Document for Box<D> {
    fn apply_action(&mut self, action: &str) -> Result<(), DocumentError> {
        (**self).apply_action(action)
    }

    fn reset_to_empty(&mut self) -> Result<(), DocumentError> {
        (**self).reset_to_empty()
    }

    fn persist_snapshot(&mut self, path: &Path) -> Result<(), DocumentError> {
        (**self).persist_snapshot(path)
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        (**self).snapshot_path()
    }

    fn set_display_mode(&mut self, mode: DisplayMode) -> DisplayMode {
        (**self).set_display_mode(mode)
    }
}

/// Holds a document in [`DisplayMode::Headless`] until dropped.
pub struct DisplayGuard<'a, D: Document + ?Sized> {
    document: &'a mut D,
    previous: DisplayMode,
}

impl<'a, D: Document + ?Sized> DisplayGuard<'a, D> {
    /// Switch `document` to headless mode.
    pub fn headless(document: &'a mut D) -> Self {
        let previous = document.set_display_mode(DisplayMode::Headless);
        Self { document, previous }
    }
}

impl<D: Document + ?Sized> Deref for DisplayGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &*self.document
    }
}

impl<D: Document + ?Sized> DerefMut for DisplayGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut *self.document
    }
}

impl<D: Document + ?Sized> Drop for DisplayGuard<'_, D> {
    fn drop(&mut self) {
        self.document.set_display_mode(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ModeRecorder {
        mode: DisplayMode,
        seen: Vec<DisplayMode>,
    }

    impl Document for ModeRecorder {
        fn apply_action(&mut self, _action: &str) -> Result<(), DocumentError> {
            self.seen.push(self.mode);
            Ok(())
        }

        fn reset_to_empty(&mut self) -> Result<(), DocumentError> {
            Ok(())
        }

        fn persist_snapshot(&mut self, _path: &Path) -> Result<(), DocumentError> {
            Ok(())
        }

        fn snapshot_path(&self) -> Option<PathBuf> {
            None
        }

        fn set_display_mode(&mut self, mode: DisplayMode) -> DisplayMode {
            std::mem::replace(&mut self.mode, mode)
        }
    }

    #[test]
    fn guard_is_headless_while_held_and_restores_on_drop() {
        let mut recorder = ModeRecorder::default();
        {
            let mut guard = DisplayGuard::headless(&mut recorder);
            guard.apply_action("x").unwrap();
        }
        assert_eq!(recorder.seen, [DisplayMode::Headless]);
        assert_eq!(recorder.mode, DisplayMode::Interactive);
    }

    #[test]
    fn nested_guards_restore_outer_mode() {
        let mut recorder = ModeRecorder::default();
        {
            let mut outer = DisplayGuard::headless(&mut recorder);
            {
                let _inner = DisplayGuard::headless(&mut *outer);
            }
            assert_eq!(outer.mode, DisplayMode::Headless);
        }
        assert_eq!(recorder.mode, DisplayMode::Interactive);
    }
}
