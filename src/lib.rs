//! scenelog library crate.
//!
//! Version control for a single 3D scene document. User actions are filtered
//! into a replayable log, paired with binary snapshots, and committed into a
//! git history with branches. Historical states are rebuilt by replaying the
//! log from an empty document rather than by diffing snapshots.
//!
//! The `scenelog` binary is a thin operator surface over [`session::Session`]
//! driving a [`scene::HeadlessScene`].

pub mod actionlog;
pub mod capture;
pub mod config;
pub mod document;
pub mod error;
pub mod layout;
pub mod replay;
pub mod scene;
pub mod session;
pub mod store;
pub mod telemetry;

pub use capture::Action;
pub use capture::filter::{ActionFilter, FilterRules};
pub use config::ProjectConfig;
pub use document::{DisplayGuard, DisplayMode, Document};
pub use error::{DocumentError, ReplayError, SessionError, StoreError};
pub use layout::ProjectLayout;
pub use scene::HeadlessScene;
pub use session::{CaptureState, Session, SessionStatus};
pub use store::{BranchInfo, CommitRecord, Identity, VersionStore};
