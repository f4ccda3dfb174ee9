//! A deterministic in-memory scene that executes a subset of the host's
//! mutation grammar.
//!
//! Supported actions:
//!
//! | Action                                                  | Effect                         |
//! |---------------------------------------------------------|--------------------------------|
//! | `bpy.ops.mesh.primitive_<kind>_add(location=(x, y, z))` | add an object, select it only  |
//! | `bpy.ops.object.select_all(action='SELECT')`            | also `DESELECT`, `TOGGLE`, `INVERT` |
//! | `bpy.ops.object.delete(...)`                            | delete the selected objects    |
//! | `bpy.ops.transform.translate(value=(x, y, z))`          | move the selected objects      |
//! | `bpy.ops.material.new()`                                | add a material                 |
//! | `bpy.context.object.active_material = bpy.data.materials[-1]` | assign the newest material |
//! | `bpy.context.object.name = "..."`                       | rename the active object       |
//!
//! Anything else is a [`DocumentError`].

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{DisplayMode, Document};
use crate::error::DocumentError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// One object in the scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: String,
    pub location: [f64; 3],
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

/// The serializable scene state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneState {
    pub objects: Vec<SceneObject>,
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

/// In-memory [`Document`] with JSON snapshots.
#[derive(Clone, Debug, Default)]
pub struct HeadlessScene {
    state: SceneState,
    mode: DisplayMode,
    snapshot: Option<PathBuf>,
}

impl HeadlessScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scene from a snapshot written by [`Document::persist_snapshot`].
    ///
    /// # Errors
    /// Returns [`DocumentError`] if the file is unreadable or not a snapshot.
    pub fn from_snapshot(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path)
            .map_err(|e| DocumentError::new(format!("read {}: {e}", path.display())))?;
        let state = serde_json::from_slice(&bytes)
            .map_err(|e| DocumentError::new(format!("parse {}: {e}", path.display())))?;
        Ok(Self {
            state,
            mode: DisplayMode::default(),
            snapshot: Some(path.to_owned()),
        })
    }

    #[must_use]
    pub const fn state(&self) -> &SceneState {
        &self.state
    }

    #[must_use]
    pub const fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    /// SHA-256 over the canonical JSON encoding of the state, as hex.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Serializing plain structs of strings, floats and vecs cannot fail.
        if let Ok(bytes) = serde_json::to_vec(&self.state) {
            hasher.update(&bytes);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    fn active_index(&self) -> Result<usize, DocumentError> {
        let name = self
            .state
            .active
            .as_deref()
            .ok_or_else(|| DocumentError::new("no active object"))?;
        self.state
            .objects
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| DocumentError::new(format!("active object '{name}' vanished")))
    }

    fn add_primitive(&mut self, kind: &str, args: &str) -> Result<(), DocumentError> {
        let location = match kwarg(args, "location") {
            Some(value) => parse_vector(value)?,
            None => [0.0; 3],
        };
        let base = capitalize(kind);
        let name = unique_name(&base, self.state.objects.iter().map(|o| o.name.as_str()));
        for object in &mut self.state.objects {
            object.selected = false;
        }
        self.state.objects.push(SceneObject {
            name: name.clone(),
            kind: kind.to_owned(),
            location,
            selected: true,
            material: None,
        });
        self.state.active = Some(name);
        Ok(())
    }

    fn select_all(&mut self, args: &str) -> Result<(), DocumentError> {
        let action = kwarg(args, "action").map_or(Ok("TOGGLE"), parse_string)?;
        let any_selected = self.state.objects.iter().any(|o| o.selected);
        for object in &mut self.state.objects {
            object.selected = match action {
                "SELECT" => true,
                "DESELECT" => false,
                "INVERT" => !object.selected,
                "TOGGLE" => !any_selected,
                other => {
                    return Err(DocumentError::new(format!(
                        "unknown select_all action '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    fn delete_selected(&mut self) {
        self.state.objects.retain(|o| !o.selected);
        let active_alive = self
            .state
            .active
            .as_deref()
            .is_some_and(|name| self.state.objects.iter().any(|o| o.name == name));
        if !active_alive {
            self.state.active = None;
        }
    }

    fn translate(&mut self, args: &str) -> Result<(), DocumentError> {
        let value = kwarg(args, "value")
            .ok_or_else(|| DocumentError::new("translate requires value=(x, y, z)"))?;
        let delta = parse_vector(value)?;
        for object in self.state.objects.iter_mut().filter(|o| o.selected) {
            for (axis, d) in object.location.iter_mut().zip(delta) {
                *axis += d;
            }
        }
        Ok(())
    }

    fn new_material(&mut self) {
        let name = unique_name("Material", self.state.materials.iter().map(String::as_str));
        self.state.materials.push(name);
    }

    fn assign_active_material(&mut self, expr: &str) -> Result<(), DocumentError> {
        if expr != "bpy.data.materials[-1]" {
            return Err(DocumentError::new(format!(
                "unsupported material expression '{expr}'"
            )));
        }
        let material = self
            .state
            .materials
            .last()
            .cloned()
            .ok_or_else(|| DocumentError::new("no materials to assign"))?;
        let index = self.active_index()?;
        self.state.objects[index].material = Some(material);
        Ok(())
    }

    fn rename_active(&mut self, expr: &str) -> Result<(), DocumentError> {
        let wanted = parse_string(expr)?;
        let index = self.active_index()?;
        let others = self
            .state
            .objects
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, o)| o.name.as_str());
        let name = unique_name(wanted, others);
        self.state.objects[index].name.clone_from(&name);
        self.state.active = Some(name);
        Ok(())
    }
}

impl Document for HeadlessScene {
    fn apply_action(&mut self, action: &str) -> Result<(), DocumentError> {
        let action = action.trim();
        if let Some((target, expr)) = action.split_once('=').filter(|(l, _)| !l.contains('(')) {
            return match target.trim() {
                "bpy.context.object.active_material" => self.assign_active_material(expr.trim()),
                "bpy.context.object.name" => self.rename_active(expr.trim()),
                other => Err(DocumentError::new(format!(
                    "unsupported assignment to '{other}'"
                ))),
            };
        }

        let (op, args) = split_call(action)
            .ok_or_else(|| DocumentError::new(format!("not a call: '{action}'")))?;
        if let Some(kind) = op
            .strip_prefix("bpy.ops.mesh.primitive_")
            .and_then(|rest| rest.strip_suffix("_add"))
            .filter(|kind| !kind.is_empty())
        {
            return self.add_primitive(kind, args);
        }
        match op {
            "bpy.ops.object.select_all" => self.select_all(args),
            "bpy.ops.object.delete" => {
                self.delete_selected();
                Ok(())
            }
            "bpy.ops.transform.translate" => self.translate(args),
            "bpy.ops.material.new" => {
                self.new_material();
                Ok(())
            }
            other => Err(DocumentError::new(format!("unsupported operator '{other}'"))),
        }
    }

    fn reset_to_empty(&mut self) -> Result<(), DocumentError> {
        self.state = SceneState::default();
        Ok(())
    }

    fn persist_snapshot(&mut self, path: &Path) -> Result<(), DocumentError> {
        let fail = |e: &dyn std::fmt::Display| {
            DocumentError::new(format!("write snapshot {}: {e}", path.display()))
        };
        let bytes = serde_json::to_vec_pretty(&self.state).map_err(|e| fail(&e))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(&e))?;
        tmp.write_all(&bytes).map_err(|e| fail(&e))?;
        tmp.as_file().sync_all().map_err(|e| fail(&e))?;
        tmp.persist(path).map_err(|e| fail(&e.error))?;
        self.snapshot = Some(path.to_owned());
        Ok(())
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot.clone()
    }

    fn set_display_mode(&mut self, mode: DisplayMode) -> DisplayMode {
        std::mem::replace(&mut self.mode, mode)
    }
}

// ---------------------------------------------------------------------------
// Action parsing
// ---------------------------------------------------------------------------

/// Split `op(args)` into `("op", "args")`.
fn split_call(action: &str) -> Option<(&str, &str)> {
    let open = action.find('(')?;
    let args = action[open + 1..].strip_suffix(')')?;
    Some((action[..open].trim(), args))
}

/// Top-level comma-separated arguments, ignoring commas inside parentheses
/// and quotes.
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// The value of keyword argument `key`, if present.
fn kwarg<'a>(args: &'a str, key: &str) -> Option<&'a str> {
    split_args(args).into_iter().find_map(|arg| {
        let (k, v) = arg.split_once('=')?;
        (k.trim() == key).then(|| v.trim())
    })
}

fn parse_vector(value: &str) -> Result<[f64; 3], DocumentError> {
    let bad = || DocumentError::new(format!("expected (x, y, z), got '{value}'"));
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(bad)?;
    let mut out = [0.0; 3];
    let parts = split_args(inner);
    if parts.len() != 3 {
        return Err(bad());
    }
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|_| bad())?;
    }
    Ok(out)
}

fn parse_string(value: &str) -> Result<&str, DocumentError> {
    ['\'', '"']
        .into_iter()
        .find_map(|q| value.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
        .ok_or_else(|| DocumentError::new(format!("expected a quoted string, got '{value}'")))
}

fn capitalize(kind: &str) -> String {
    kind.split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `base`, or `base.001`, `base.002`, ... whichever is first unused.
fn unique_name<'a>(base: &str, existing: impl Iterator<Item = &'a str> + Clone) -> String {
    let taken = |candidate: &str| existing.clone().any(|name| name == candidate);
    if !taken(base) {
        return base.to_owned();
    }
    (1..)
        .map(|n| format!("{base}.{n:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_after(actions: &[&str]) -> HeadlessScene {
        let mut scene = HeadlessScene::new();
        for action in actions {
            scene.apply_action(action).unwrap();
        }
        scene
    }

    fn names(scene: &HeadlessScene) -> Vec<&str> {
        scene.state().objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn primitives_get_unique_names_and_become_active() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add(size=2, location=(1, 2, 3))",
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.mesh.primitive_uv_sphere_add(radius=1)",
        ]);
        assert_eq!(names(&scene), ["Cube", "Cube.001", "Uv Sphere"]);
        assert_eq!(scene.state().objects[0].location, [1.0, 2.0, 3.0]);
        assert_eq!(scene.state().active.as_deref(), Some("Uv Sphere"));
        let selected: Vec<bool> = scene.state().objects.iter().map(|o| o.selected).collect();
        assert_eq!(selected, [false, false, true]);
    }

    #[test]
    fn delete_removes_selected_objects() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.mesh.primitive_cone_add()",
            "bpy.ops.object.delete(use_global=False, confirm=False)",
        ]);
        assert_eq!(names(&scene), ["Cube"]);
        assert_eq!(scene.state().active, None);
    }

    #[test]
    fn select_all_then_delete_empties_scene() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.mesh.primitive_cone_add()",
            "bpy.ops.object.select_all(action='SELECT')",
            "bpy.ops.object.delete()",
        ]);
        assert!(scene.state().objects.is_empty());
    }

    #[test]
    fn translate_moves_selection() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.transform.translate(value=(1.5, 0, -2), orient_type='GLOBAL')",
        ]);
        assert_eq!(scene.state().objects[0].location, [1.5, 0.0, -2.0]);
    }

    #[test]
    fn material_assignment_uses_newest_material() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.material.new()",
            "bpy.ops.material.new()",
            "bpy.context.object.active_material = bpy.data.materials[-1]",
        ]);
        assert_eq!(scene.state().materials, ["Material", "Material.001"]);
        assert_eq!(
            scene.state().objects[0].material.as_deref(),
            Some("Material.001")
        );
    }

    #[test]
    fn rename_keeps_names_unique() {
        let scene = scene_after(&[
            "bpy.ops.mesh.primitive_cube_add()",
            "bpy.ops.mesh.primitive_cone_add()",
            "bpy.context.object.name = \"Cube\"",
        ]);
        assert_eq!(names(&scene), ["Cube", "Cube.001"]);
        assert_eq!(scene.state().active.as_deref(), Some("Cube.001"));
    }

    #[test]
    fn unsupported_actions_are_errors() {
        let mut scene = HeadlessScene::new();
        assert!(scene.apply_action("bpy.ops.render.render()").is_err());
        assert!(scene.apply_action("print('hi')").is_err());
        assert!(
            scene
                .apply_action("bpy.context.object.active_material = bpy.data.materials[-1]")
                .is_err()
        );
    }

    #[test]
    fn snapshot_round_trips_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.blend");
        let mut scene = scene_after(&["bpy.ops.mesh.primitive_cube_add(location=(0, 1, 0))"]);
        scene.persist_snapshot(&path).unwrap();
        let loaded = HeadlessScene::from_snapshot(&path).unwrap();
        assert_eq!(loaded.state(), scene.state());
        assert_eq!(loaded.fingerprint(), scene.fingerprint());
        assert_eq!(scene.snapshot_path(), Some(path));
    }

    #[test]
    fn fingerprint_tracks_state() {
        let empty = HeadlessScene::new();
        let cube = scene_after(&["bpy.ops.mesh.primitive_cube_add()"]);
        assert_ne!(empty.fingerprint(), cube.fingerprint());
        assert_eq!(empty.fingerprint().len(), 64);
    }

    #[test]
    fn split_args_respects_nesting_and_quotes() {
        assert_eq!(
            split_args("value=(1, 2, 3), name='a,b', flag=True"),
            ["value=(1, 2, 3)", "name='a,b'", "flag=True"]
        );
    }
}
