//! Branch name validation following git-style conventions.
//!
//! Valid branch names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty and not start with `.`
//! - Must not end with `.`

use crate::error::{RefError, Result};

/// Prefix of every branch ref path.
pub const BRANCH_PREFIX: &str = "refs/heads/";

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Substrings that are forbidden anywhere in a branch name.
const FORBIDDEN_SEQUENCES: &[&str] = &["..", "@{"];

/// The ref path for a branch name, e.g. `refs/heads/main`.
pub fn branch_ref(name: &str) -> String {
    format!("{BRANCH_PREFIX}{name}")
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// Branch names become file paths under `refs/heads/`, so anything that could
/// escape that directory or be mistaken for revision syntax is rejected.
///
/// # Examples
///
/// ```
/// use delta_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: String| {
        Err(RefError::InvalidBranchName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("branch name must not be empty".into());
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return invalid(format!("contains forbidden character: {ch:?}"));
    }
    if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| name.contains(**s)) {
        return invalid(format!("must not contain {seq:?}"));
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return invalid("must not end with '.' or '.lock'".into());
    }
    for component in name.split('/') {
        if component.is_empty() {
            return invalid("path components must not be empty".into());
        }
        if component.starts_with('.') {
            return invalid(format!("component must not start with '.': {component:?}"));
        }
    }
    Ok(())
}
