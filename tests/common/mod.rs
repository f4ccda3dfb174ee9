//! Shared test helpers for scenelog integration tests.
//!
//! Every test works in its own temp directory; no git binary is needed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use scenelog::store::{Identity, VersionStore};
use scenelog::{HeadlessScene, ProjectLayout, Session};
use tempfile::TempDir;

pub const CUBE: &str = "bpy.ops.mesh.primitive_cube_add()";
pub const CONE: &str = "bpy.ops.mesh.primitive_cone_add()";
pub const SELECT_ALL: &str = "bpy.ops.object.select_all(action='SELECT')";
pub const NON_GLOBAL_DELETE: &str = "bpy.ops.object.delete(use_global=False, confirm=False)";

pub fn identity() -> Identity {
    Identity::new("Artist", "a@e")
}

/// A fresh project directory named `scene` inside a temp dir.
pub fn project_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let root = dir.path().join("scene");
    (dir, root)
}

/// A created project driven by a headless scene that executes actions.
pub fn new_session() -> (TempDir, Session<HeadlessScene>) {
    let (dir, root) = project_root();
    let mut session =
        Session::create(&root, identity(), HeadlessScene::new()).expect("create project");
    session.set_executes_actions(true);
    (dir, session)
}

/// Reopen the project at `root` with a fresh scene.
pub fn reopen(root: &Path) -> Session<HeadlessScene> {
    let mut session = Session::open(root, HeadlessScene::new()).expect("open project");
    session.set_executes_actions(true);
    session
}

/// An initialized bare store (no session) with the default layout.
pub fn new_store() -> (TempDir, VersionStore) {
    let (dir, root) = project_root();
    let layout = ProjectLayout::new(&root, "scene", "blend");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(layout.log_path(), "# scenelog action log v1\n").unwrap();
    let store = VersionStore::init(&layout, &identity(), "main").expect("init store");
    (dir, store)
}

/// Record `records` and commit them.
pub fn record_and_commit(
    session: &mut Session<HeadlessScene>,
    records: &[&str],
    message: &str,
) -> scenelog_git::GitOid {
    for record in records {
        session.on_action(record);
    }
    session.commit(message).expect("commit")
}

/// Commit messages of `branch`, most recent first.
pub fn messages(session: &Session<HeadlessScene>, branch: &str) -> Vec<String> {
    session
        .commits(branch)
        .unwrap()
        .map(|c| c.unwrap().message)
        .collect()
}

/// Run the `scenelog` binary with `-C dir`.
pub fn scenelog_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scenelog"))
        .arg("-C")
        .arg(dir)
        .args(args)
        .env_remove("SCENELOG_TRACE")
        .output()
        .expect("failed to run scenelog")
}

/// Run `scenelog` and assert success, returning stdout.
pub fn scenelog_ok(dir: &Path, args: &[&str]) -> String {
    let out = scenelog_in(dir, args);
    assert!(
        out.status.success(),
        "scenelog {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}
