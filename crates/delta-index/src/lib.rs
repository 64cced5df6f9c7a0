//! Staging index for Delta.
//!
//! The index records the file set of the next commit: every tracked path,
//! the object id of its staged content, and a cache of the working-copy
//! metadata observed when it was staged. It is persisted as one binary file
//! with a trailing SHA-1 checksum and is always rewritten whole.
//!
//! # Key Types
//!
//! - [`StagingIndex`] -- Load, merge and save the on-disk index
//! - [`IndexEntry`] -- One tracked path and its fixed-layout record
//! - [`WorkingCopy`] -- Source of file bytes and metadata for new entries
//! - [`FsWorkingCopy`] -- [`WorkingCopy`] over a directory on disk

pub mod entry;
pub mod error;
pub mod index;
pub mod workdir;

pub use entry::{IndexEntry, ENTRY_METADATA_LEN};
pub use error::{IndexError, IndexResult};
pub use index::{AddSummary, StagingIndex, TrackedFile, INDEX_SIGNATURE, INDEX_VERSION};
pub use workdir::{FileStat, FsWorkingCopy, WorkingCopy};
