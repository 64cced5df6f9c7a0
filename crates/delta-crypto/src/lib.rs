//! Hashing primitives for Delta.
//!
//! Provides the type-tagged SHA-1 hasher that assigns object ids and the
//! plain whole-buffer digest used as the staging index trailer.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;

pub use hasher::{checksum, object_header, ObjectHasher};
