//! Reference management for Delta.
//!
//! References are the human-readable entry points into commit history:
//!
//! - **HEAD** names the current branch as a ref path such as
//!   `refs/heads/main`.
//! - **Branches** live at `refs/heads/<name>` and hold the 40-hex id of their
//!   tip commit. A branch created before the first commit holds nothing,
//!   which marks the next commit as a root commit.
//!
//! # Modules
//!
//! - [`error`] — Error types for ref operations
//! - [`traits`] — The [`RefStore`] trait defining the storage interface
//! - [`names`] — Branch name validation
//! - [`file`] — [`FileRefStore`], plain text files under the repository
//!   directory

pub mod error;
pub mod file;
pub mod names;
pub mod traits;

pub use error::{RefError, Result};
pub use file::FileRefStore;
pub use names::{branch_ref, validate_branch_name, BRANCH_PREFIX};
pub use traits::RefStore;
