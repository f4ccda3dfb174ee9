//! Deterministic reconstruction of a document from its action log.
//!
//! Replay resets the document to its empty baseline and executes every action
//! in stored order, with the document held in headless mode by a
//! [`DisplayGuard`]. It runs to completion or stops at the first failing
//! action; there is no rollback, the document is left at the last action that
//! succeeded.

use tracing::instrument;

use crate::capture::Action;
use crate::document::{DisplayGuard, Document};
use crate::error::ReplayError;

/// Outcome of a successful replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Number of actions executed.
    pub executed: usize,
}

/// Reset `document` and execute `log` from the start.
///
/// # Errors
/// [`ReplayError::Reset`] if the document cannot be reset, or
/// [`ReplayError::ReplayFailure`] naming the first action that failed.
pub fn replay<D: Document + ?Sized>(
    document: &mut D,
    log: &[Action],
) -> Result<ReplayReport, ReplayError> {
    replay_segments(document, &[log])
}

/// Reset `document` and execute each segment in turn, as one continuous log.
/// Failure indexes count across segments.
///
/// # Errors
/// As for [`replay`].
#[instrument(skip_all, fields(segments = segments.len()))]
pub fn replay_segments<D: Document + ?Sized>(
    document: &mut D,
    segments: &[&[Action]],
) -> Result<ReplayReport, ReplayError> {
    let mut guard = DisplayGuard::headless(document);
    guard.reset_to_empty().map_err(ReplayError::Reset)?;

    let mut executed = 0;
    for action in segments.iter().flat_map(|segment| segment.iter()) {
        if let Err(reason) = guard.apply_action(action.text()) {
            tracing::warn!(index = executed, action = action.text(), %reason, "replay stopped");
            return Err(ReplayError::ReplayFailure {
                index: executed,
                action: action.text().to_owned(),
                reason,
            });
        }
        executed += 1;
    }
    tracing::debug!(executed, "replay complete");
    Ok(ReplayReport { executed })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::scene::HeadlessScene;
    use proptest::prelude::*;

    fn arb_action() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("bpy.ops.mesh.primitive_cube_add()".to_owned()),
            Just("bpy.ops.mesh.primitive_cone_add()".to_owned()),
            Just("bpy.ops.object.select_all(action='SELECT')".to_owned()),
            Just("bpy.ops.object.select_all(action='INVERT')".to_owned()),
            Just("bpy.ops.object.delete()".to_owned()),
            Just("bpy.ops.material.new()".to_owned()),
            (-5i32..5, -5i32..5, -5i32..5).prop_map(|(x, y, z)| format!(
                "bpy.ops.transform.translate(value=({x}, {y}, {z}))"
            )),
        ]
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(texts in prop::collection::vec(arb_action(), 0..30)) {
            let log: Vec<Action> = texts.iter().zip(0..).map(|(t, i)| Action::stored(t.as_str(), i)).collect();
            let mut a = HeadlessScene::new();
            let mut b = HeadlessScene::new();
            b.apply_action("bpy.ops.mesh.primitive_cube_add()").unwrap();
            replay(&mut a, &log).unwrap();
            replay(&mut b, &log).unwrap();
            prop_assert_eq!(a.state(), b.state());
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }
}
