//! Project configuration (`.scenelog/config.toml`).
//!
//! Defines the typed configuration for a scenelog project: artifact naming,
//! the commit identity, the capture filter rules, and replay behaviour.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::filter::FilterRules;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level project configuration.
///
/// Parsed from `.scenelog/config.toml`. Missing fields use defaults.
/// Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Artifact naming and branch settings.
    #[serde(default)]
    pub project: ProjectSection,

    /// Commit identity.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Capture filter rules.
    #[serde(default)]
    pub filter: FilterRules,

    /// Replay settings.
    #[serde(default)]
    pub replay: ReplayConfig,
}

// ---------------------------------------------------------------------------
// ProjectSection
// ---------------------------------------------------------------------------

/// Artifact naming and branch settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Base name of the log and snapshot artifacts. `None` means the project
    /// directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Extension of the snapshot file (default: `"blend"`).
    #[serde(default = "default_snapshot_extension")]
    pub snapshot_extension: String,

    /// The branch created by `init` (default: `"main"`).
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            snapshot_extension: default_snapshot_extension(),
            branch: default_branch(),
        }
    }
}

fn default_snapshot_extension() -> String {
    "blend".to_owned()
}

fn default_branch() -> String {
    "main".to_owned()
}

// ---------------------------------------------------------------------------
// IdentityConfig
// ---------------------------------------------------------------------------

/// The author identity written into the repository config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Author name (default: `"Artist"`).
    #[serde(default = "default_identity_name")]
    pub name: String,

    /// Author email (default: `"artist@example.com"`).
    #[serde(default = "default_identity_email")]
    pub email: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_identity_name(),
            email: default_identity_email(),
        }
    }
}

fn default_identity_name() -> String {
    "Artist".to_owned()
}

fn default_identity_email() -> String {
    "artist@example.com".to_owned()
}

// ---------------------------------------------------------------------------
// ReplayConfig
// ---------------------------------------------------------------------------

/// Replay settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    /// Whether opening a project also replays the actions saved since the
    /// last commit (default: `true`). When `false` the journal is discarded
    /// and the document opens at HEAD.
    #[serde(default = "default_include_pending")]
    pub include_pending_on_open: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            include_pending_on_open: default_include_pending(),
        }
    }
}

const fn default_include_pending() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading or saving a project configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl ProjectConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns `ConfigError` if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let err = |message: String| ConfigError {
            path: Some(path.to_owned()),
            message,
        };
        let text = toml::to_string_pretty(self).map_err(|e| err(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| err(format!("could not create directory: {e}")))?;
        }
        std::fs::write(path, text).map_err(|e| err(format!("could not write file: {e}")))
    }

    /// The artifact base name: the configured name, or the name of the
    /// directory `root` resolves to, or `"scene"` when neither is usable.
    ///
    /// A root spelled without a final component (`.`, `robot/..`) is
    /// canonicalized first.
    #[must_use]
    pub fn artifact_name(&self, root: &Path) -> String {
        self.project
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| directory_name(root))
            .unwrap_or_else(|| "scene".to_owned())
    }
}

fn directory_name(root: &Path) -> Option<String> {
    let name = |path: &Path| path.file_name().and_then(|n| n.to_str()).map(str::to_owned);
    name(root).or_else(|| std::fs::canonicalize(root).ok().and_then(|p| name(&p)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
