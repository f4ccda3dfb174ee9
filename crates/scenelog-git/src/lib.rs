//! Git abstraction layer for scenelog.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which the version store talks to git. No other scenelog crate imports gix
//! directly; they depend on `scenelog-git` and program against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`], [`RefName`],
//!   [`TreeEntry`], [`CommitInfo`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod error;
pub mod repo;
pub mod types;

// gix-backed implementation modules
mod gix_repo;
mod refs_impl;
mod objects_impl;
mod checkout_impl;
mod config_impl;

pub use gix_repo::GixRepo;

// Re-export the main trait and commonly used types at the crate root for
// ergonomic imports: `use scenelog_git::{GitRepo, GitOid, GitError};`
pub use error::GitError;
pub use repo::GitRepo;
pub use types::{
    CommitInfo, EntryMode, GitOid, OidParseError, RefEdit, RefName, RefNameError, TreeEntry,
};
