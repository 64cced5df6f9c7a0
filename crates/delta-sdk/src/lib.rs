//! High-level SDK for Delta.
//!
//! [`Repository`] is the explicit context value that ties one working copy to
//! its `.delta` directory: object store, staging index, refs and
//! configuration. Every operation goes through it, so several repositories
//! can be used side by side in one process.

pub mod config;
pub mod error;
pub mod repository;

pub use config::{CoreConfig, RepoConfig, UserConfig, AUTHOR_EMAIL_ENV, AUTHOR_NAME_ENV};
pub use error::{SdkError, SdkResult};
pub use repository::{LogEntry, Repository, IGNORE_FILE, REPO_DIR};

// Re-export key types
pub use delta_diff::{DiffLine, LineDiff};
pub use delta_store::{Blob, Commit, EntryMode, Signature, Tree, TreeEntry};
pub use delta_types::ObjectId;
