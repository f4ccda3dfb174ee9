//! On-disk layout of a scenelog project.
//!
//! | Path                        | Tracked | Purpose                         |
//! |-----------------------------|---------|---------------------------------|
//! | `<name>.actions`            | yes     | committed action log            |
//! | `<name>.<ext>`              | yes     | snapshot                        |
//! | `.gitignore`                | yes     | ignore marker                   |
//! | `.scenelog/pending.actions` | no      | actions saved since last commit |
//! | `.scenelog/config.toml`     | no      | project configuration           |

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;

/// Directory holding untracked scenelog state.
pub const STATE_DIR: &str = ".scenelog";

/// Extension of the action log artifacts.
pub const LOG_EXTENSION: &str = "actions";

/// Name of the ignore marker file.
pub const IGNORE_FILE: &str = ".gitignore";

/// Resolved paths of every artifact inside a project root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    name: String,
    snapshot_extension: String,
}

impl ProjectLayout {
    /// Layout for `root` with artifacts called `name`.
    pub fn new(
        root: impl Into<PathBuf>,
        name: impl Into<String>,
        snapshot_extension: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            snapshot_extension: snapshot_extension.into(),
        }
    }

    /// Layout for `root` as described by `config`.
    #[must_use]
    pub fn from_config(root: &Path, config: &ProjectConfig) -> Self {
        Self::new(
            root,
            config.artifact_name(root),
            config.project.snapshot_extension.clone(),
        )
    }

    /// Path of the configuration file under `root`, before any layout is known.
    #[must_use]
    pub fn config_path_for(root: &Path) -> PathBuf {
        root.join(STATE_DIR).join("config.toml")
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tracked file name of the committed log, relative to the root.
    #[must_use]
    pub fn log_file_name(&self) -> String {
        format!("{}.{LOG_EXTENSION}", self.name)
    }

    /// Tracked file name of the snapshot, relative to the root.
    #[must_use]
    pub fn snapshot_file_name(&self) -> String {
        format!("{}.{}", self.name, self.snapshot_extension)
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.root.join(self.log_file_name())
    }

    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(self.snapshot_file_name())
    }

    #[must_use]
    pub fn ignore_path(&self) -> PathBuf {
        self.root.join(IGNORE_FILE)
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    #[must_use]
    pub fn pending_path(&self) -> PathBuf {
        self.state_dir().join(format!("pending.{LOG_EXTENSION}"))
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        Self::config_path_for(&self.root)
    }

    /// Every tracked file name, in the order they are staged.
    #[must_use]
    pub fn tracked_files(&self) -> [String; 3] {
        [
            IGNORE_FILE.to_owned(),
            self.log_file_name(),
            self.snapshot_file_name(),
        ]
    }

    /// Content of the ignore marker: untracked state, external assets, and
    /// the host's numbered snapshot backups (`scene.blend1`, ...).
    #[must_use]
    pub fn ignore_marker(&self) -> String {
        format!(
            "{STATE_DIR}/\nassets/\n*.{}?*\n",
            self.snapshot_extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_artifact_name() {
        let layout = ProjectLayout::new("/work/robot", "robot", "blend");
        assert_eq!(layout.log_path(), Path::new("/work/robot/robot.actions"));
        assert_eq!(layout.snapshot_path(), Path::new("/work/robot/robot.blend"));
        assert_eq!(
            layout.pending_path(),
            Path::new("/work/robot/.scenelog/pending.actions")
        );
        assert_eq!(
            layout.config_path(),
            Path::new("/work/robot/.scenelog/config.toml")
        );
    }

    #[test]
    fn ignore_marker_covers_state_and_backups() {
        let layout = ProjectLayout::new("/p", "p", "blend");
        let marker = layout.ignore_marker();
        let lines: Vec<&str> = marker.lines().collect();
        assert_eq!(lines, [".scenelog/", "assets/", "*.blend?*"]);
    }

    #[test]
    fn from_config_uses_directory_name_by_default() {
        let layout = ProjectLayout::from_config(Path::new("/work/hero"), &ProjectConfig::default());
        assert_eq!(layout.name(), "hero");
        assert_eq!(layout.snapshot_file_name(), "hero.blend");
    }
}
