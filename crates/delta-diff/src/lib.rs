//! Diff engine for Delta.
//!
//! Compares the staged version of a file with its working-copy version line
//! by line, using a longest-common-subsequence table, and renders the result
//! as a prefixed edit script.
//!
//! # Key Types
//!
//! - [`LineDiff`] / [`DiffLine`] -- Ordered edit script of tagged lines
//! - [`diff_lines`] / [`diff_text`] -- LCS diff over lines or whole text
//! - [`diff_blobs`] -- Byte-level wrapper with binary detection

pub mod blob_diff;
pub mod lcs;

pub use blob_diff::diff_blobs;
pub use lcs::{diff_lines, diff_text, DiffLine, LineDiff};
