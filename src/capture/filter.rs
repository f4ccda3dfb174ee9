//! Classification of raw host records into replayable actions.
//!
//! The host reports everything it does: real mutation calls, UI-only side
//! effects, and human-readable notifications. [`ActionFilter`] keeps only what
//! is needed to reproduce the document:
//!
//! 1. A notification matched by a [`NotificationRule`] is rewritten into its
//!    replacement call, unless the previous accepted action already covers it
//!    (a delete call followed by its "Deleted ..." notice yields one delete).
//! 2. Records that do not start with the executable prefix are dropped.
//! 3. Records matching a UI denylist prefix are dropped.
//! 4. Everything else is accepted. An accepted [`FollowUpRule`] trigger is
//!    followed by the rule's synthesized action.
//!
//! The synthesized follow-up is held until the next record arrives. If that
//! record is the follow-up itself it is accepted once, which is what makes
//! filtering an already-filtered log a no-op.

use serde::{Deserialize, Serialize};

use super::Action;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Rewrites a host notification into an explicit action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationRule {
    /// Records starting with this prefix are notifications.
    pub prefix: String,
    /// An accepted action starting with this prefix, immediately before the
    /// notification, already performed the change.
    pub covered_by: String,
    /// The action emitted for an uncovered notification.
    pub replacement: String,
}

/// Synthesizes an action after a trigger the host does not fully report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpRule {
    /// The exact accepted action that triggers the follow-up.
    pub trigger: String,
    /// The action appended after the trigger.
    pub action: String,
}

/// The complete filter policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRules {
    /// Prefix of calls into the document's mutation API.
    #[serde(default = "default_executable_prefix")]
    pub executable_prefix: String,

    /// Prefixes of UI-only side effects that must not be replayed.
    #[serde(default = "default_ui_denylist")]
    pub ui_denylist: Vec<String>,

    /// Notification compensations.
    #[serde(default = "default_notifications")]
    pub notifications: Vec<NotificationRule>,

    /// Follow-up synthesis.
    #[serde(default = "default_follow_ups")]
    pub follow_ups: Vec<FollowUpRule>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            executable_prefix: default_executable_prefix(),
            ui_denylist: default_ui_denylist(),
            notifications: default_notifications(),
            follow_ups: default_follow_ups(),
        }
    }
}

fn default_executable_prefix() -> String {
    "bpy.".to_owned()
}

fn default_ui_denylist() -> Vec<String> {
    vec![
        "bpy.context.space_data.".to_owned(),
        "bpy.data.window_managers[".to_owned(),
    ]
}

fn default_notifications() -> Vec<NotificationRule> {
    vec![NotificationRule {
        prefix: "Deleted".to_owned(),
        covered_by: "bpy.ops.object.delete(".to_owned(),
        replacement: "bpy.ops.object.delete(use_global=False, confirm=False)".to_owned(),
    }]
}

fn default_follow_ups() -> Vec<FollowUpRule> {
    vec![FollowUpRule {
        trigger: "bpy.ops.material.new()".to_owned(),
        action: "bpy.context.object.active_material = bpy.data.materials[-1]".to_owned(),
    }]
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Why a record was dropped. Only used for trace output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DropReason {
    Empty,
    Multiline,
    Covered,
    NotExecutable,
    UiOnly,
}

enum Verdict<'a> {
    Accept(&'a str),
    Replace(&'a str),
    Drop(DropReason),
}

impl FilterRules {
    fn classify<'a>(&'a self, record: &'a str, previous: Option<&str>) -> Verdict<'a> {
        if record.is_empty() {
            return Verdict::Drop(DropReason::Empty);
        }
        if record.contains(['\n', '\r']) {
            return Verdict::Drop(DropReason::Multiline);
        }
        if let Some(rule) = self
            .notifications
            .iter()
            .find(|r| record.starts_with(r.prefix.as_str()))
        {
            let covered = previous.is_some_and(|p| p.starts_with(rule.covered_by.as_str()));
            return if covered {
                Verdict::Drop(DropReason::Covered)
            } else {
                Verdict::Replace(&rule.replacement)
            };
        }
        if !record.starts_with(self.executable_prefix.as_str()) {
            return Verdict::Drop(DropReason::NotExecutable);
        }
        if self
            .ui_denylist
            .iter()
            .any(|p| record.starts_with(p.as_str()))
        {
            return Verdict::Drop(DropReason::UiOnly);
        }
        Verdict::Accept(record)
    }

    fn follow_up(&self, accepted: &str) -> Option<&str> {
        self.follow_ups
            .iter()
            .find(|r| r.trigger == accepted)
            .map(|r| r.action.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionFilter
// ---------------------------------------------------------------------------

/// Streaming filter from raw host records to actions.
///
/// Feed records in arrival order with [`push`](Self::push) and call
/// [`finish`](Self::finish) before persisting, to flush a held follow-up.
#[derive(Clone, Debug)]
pub struct ActionFilter {
    rules: FilterRules,
    previous: Option<String>,
    held: Option<String>,
    next_seq: u64,
}

impl ActionFilter {
    /// A filter whose first emitted action gets sequence number 0.
    #[must_use]
    pub const fn new(rules: FilterRules) -> Self {
        Self::starting_at(rules, 0)
    }

    /// A filter that continues a log already holding `next_seq` actions.
    #[must_use]
    pub const fn starting_at(rules: FilterRules, next_seq: u64) -> Self {
        Self {
            rules,
            previous: None,
            held: None,
            next_seq,
        }
    }

    /// The rules this filter applies.
    #[must_use]
    pub const fn rules(&self) -> &FilterRules {
        &self.rules
    }

    /// Sequence number the next emitted action will get.
    #[must_use]
    pub const fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Restart numbering at `next_seq` and forget the previous action, as
    /// after a replay replaced the document.
    pub fn reset(&mut self, next_seq: u64) {
        self.previous = None;
        self.held = None;
        self.next_seq = next_seq;
    }

    /// Filter one raw record. Returns the actions it produced, possibly none.
    pub fn push(&mut self, raw: &str) -> Vec<Action> {
        let record = raw.trim_end();
        let mut out = Vec::new();

        if let Some(held) = self.held.take() {
            let duplicate = held == record;
            self.emit(held, &mut out);
            if duplicate {
                return out;
            }
        }

        match self.rules.classify(record, self.previous.as_deref()) {
            Verdict::Accept(text) => {
                let follow_up = self.rules.follow_up(text).map(str::to_owned);
                let text = text.to_owned();
                self.emit(text, &mut out);
                self.held = follow_up;
            }
            Verdict::Replace(text) => {
                tracing::trace!(record, replacement = text, "notification rewritten");
                let text = text.to_owned();
                self.emit(text, &mut out);
            }
            Verdict::Drop(reason) => {
                tracing::trace!(record, ?reason, "record dropped");
            }
        }
        out
    }

    /// Flush a held follow-up action.
    pub fn finish(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        if let Some(held) = self.held.take() {
            self.emit(held, &mut out);
        }
        out
    }

    /// Whether a follow-up is waiting for the next record.
    #[must_use]
    pub const fn has_held(&self) -> bool {
        self.held.is_some()
    }

    fn emit(&mut self, text: String, out: &mut Vec<Action>) {
        out.push(Action::captured(text.clone(), self.next_seq));
        self.next_seq += 1;
        self.previous = Some(text);
    }
}

/// Filter a complete batch of records with `rules`, returning action texts.
pub fn filter_all<I, S>(rules: &FilterRules, records: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut filter = ActionFilter::new(rules.clone());
    let mut out: Vec<Action> = Vec::new();
    for record in records {
        out.extend(filter.push(record.as_ref()));
    }
    out.extend(filter.finish());
    out.into_iter().map(|a| a.text).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NON_GLOBAL_DELETE: &str = "bpy.ops.object.delete(use_global=False, confirm=False)";
    const MATERIAL_NEW: &str = "bpy.ops.material.new()";
    const ASSIGN_MATERIAL: &str = "bpy.context.object.active_material = bpy.data.materials[-1]";

    fn run(records: &[&str]) -> Vec<String> {
        filter_all(&FilterRules::default(), records)
    }

    #[test]
    fn accepts_api_calls_in_order() {
        let out = run(&[
            "bpy.ops.mesh.primitive_cube_add(size=2)",
            "bpy.ops.transform.translate(value=(1, 0, 0))",
        ]);
        assert_eq!(
            out,
            [
                "bpy.ops.mesh.primitive_cube_add(size=2)",
                "bpy.ops.transform.translate(value=(1, 0, 0))",
            ]
        );
    }

    #[test]
    fn drops_non_api_and_ui_records() {
        let out = run(&[
            "Info: saved file",
            "bpy.context.space_data.shading.type = 'WIREFRAME'",
            "bpy.data.window_managers[\"WinMan\"].xr_session_settings.base_scale = 1",
            "",
            "bpy.ops.mesh.primitive_cube_add()",
        ]);
        assert_eq!(out, ["bpy.ops.mesh.primitive_cube_add()"]);
    }

    #[test]
    fn bare_notification_becomes_non_global_delete() {
        let out = run(&["bpy.ops.object.select_all(action='SELECT')", "Deleted 1 object(s)"]);
        assert_eq!(
            out,
            ["bpy.ops.object.select_all(action='SELECT')", NON_GLOBAL_DELETE]
        );
    }

    #[test]
    fn delete_call_followed_by_notification_yields_one_delete() {
        let out = run(&[
            "bpy.ops.object.delete(use_global=False)",
            "Deleted object_1",
        ]);
        assert_eq!(out, ["bpy.ops.object.delete(use_global=False)"]);
    }

    #[test]
    fn global_delete_is_not_duplicated() {
        let out = run(&[
            "bpy.ops.object.delete(use_global=True, confirm=False)",
            "Deleted 3 object(s)",
        ]);
        assert_eq!(out, ["bpy.ops.object.delete(use_global=True, confirm=False)"]);
    }

    #[test]
    fn dropped_record_between_delete_and_notice_does_not_uncover_it() {
        let out = run(&[
            "bpy.ops.object.delete()",
            "Info: something",
            "Deleted 1 object(s)",
        ]);
        assert_eq!(out, ["bpy.ops.object.delete()"]);
    }

    #[test]
    fn material_new_gets_assignment_follow_up() {
        let out = run(&[MATERIAL_NEW, "bpy.ops.mesh.primitive_cube_add()"]);
        assert_eq!(
            out,
            [MATERIAL_NEW, ASSIGN_MATERIAL, "bpy.ops.mesh.primitive_cube_add()"]
        );
    }

    #[test]
    fn follow_up_is_flushed_by_finish() {
        let mut filter = ActionFilter::new(FilterRules::default());
        let first = filter.push(MATERIAL_NEW);
        assert_eq!(first.len(), 1);
        assert!(filter.has_held());
        let rest = filter.finish();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].text(), ASSIGN_MATERIAL);
        assert_eq!(rest[0].seq(), 1);
    }

    #[test]
    fn follow_up_already_present_is_not_duplicated() {
        let out = run(&[MATERIAL_NEW, ASSIGN_MATERIAL]);
        assert_eq!(out, [MATERIAL_NEW, ASSIGN_MATERIAL]);
    }

    #[test]
    fn multiline_records_are_dropped() {
        let out = run(&["bpy.ops.a()\nbpy.ops.b()", "bpy.ops.c()"]);
        assert_eq!(out, ["bpy.ops.c()"]);
    }

    #[test]
    fn trailing_newline_is_trimmed() {
        let out = run(&["bpy.ops.mesh.primitive_cube_add()\n"]);
        assert_eq!(out, ["bpy.ops.mesh.primitive_cube_add()"]);
    }

    #[test]
    fn sequence_numbers_continue_from_start() {
        let mut filter = ActionFilter::starting_at(FilterRules::default(), 10);
        let out = filter.push("bpy.ops.mesh.primitive_cube_add()");
        assert_eq!(out[0].seq(), 10);
        assert_eq!(filter.next_seq(), 11);
        assert!(out[0].captured_at().is_some());
    }

    #[test]
    fn custom_rules_apply() {
        let rules = FilterRules {
            executable_prefix: "scene.".to_owned(),
            ui_denylist: vec!["scene.view.".to_owned()],
            notifications: vec![],
            follow_ups: vec![],
        };
        let out = filter_all(&rules, ["scene.add()", "scene.view.zoom()", "bpy.ops.x()"]);
        assert_eq!(out, ["scene.add()"]);
    }
}
