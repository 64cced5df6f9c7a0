//! Content-addressed object storage for Delta.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every snapshot is made of immutable objects
//! (blobs, trees, commits) identified by the SHA-1 digest of their
//! type-tagged, length-prefixed bytes.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Commit`] -- root tree, optional parent and author metadata
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- zlib-compressed files under a fan-out directory
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! [`TreeBuilder`] turns a flat `path -> (id, mode)` mapping into a hierarchy
//! of tree objects.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: storing an existing id is a no-op.
//! 3. The store only grows; nothing is evicted.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod builder;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use builder::TreeBuilder;
pub use error::{StoreError, StoreResult};
pub use loose::LooseObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{
    Blob, Commit, EntryMode, ObjectKind, Signature, StoredObject, Tree, TreeEntry, DATE_FORMAT,
};
pub use traits::ObjectStore;
