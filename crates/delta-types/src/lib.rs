//! Foundation types for Delta.
//!
//! Every other Delta crate depends on `delta-types` for the identifier that
//! names stored objects.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (20-byte SHA-1 digest)
//! - [`TypeError`] — Parse failures for hex and raw identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
