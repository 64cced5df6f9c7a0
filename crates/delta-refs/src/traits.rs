//! The [`RefStore`] trait defining the reference storage interface.

use delta_types::ObjectId;
use tracing::info;

use crate::error::{RefError, Result};
use crate::names::{branch_ref, validate_branch_name, BRANCH_PREFIX};

/// Storage backend for HEAD and named references.
///
/// Ref names are repository-relative paths such as `refs/heads/main`.
/// Backends provide the raw reads and writes; the higher-level operations are
/// default methods built on them.
pub trait RefStore {
    /// The ref path HEAD currently names.
    fn retrieve_head(&self) -> Result<String>;

    /// Point HEAD at a ref path without checking it.
    fn write_head(&self, ref_name: &str) -> Result<()>;

    /// Whether a ref exists (possibly empty).
    fn ref_exists(&self, ref_name: &str) -> Result<bool>;

    /// Read the commit id a ref holds.
    ///
    /// Returns `Ok(None)` if the ref does not exist or holds nothing yet.
    fn read_ref(&self, ref_name: &str) -> Result<Option<ObjectId>>;

    /// Create or overwrite a ref. `None` writes an empty ref.
    fn write_ref(&self, ref_name: &str, id: Option<&ObjectId>) -> Result<()>;

    /// Names of all branches, sorted.
    fn branches(&self) -> Result<Vec<String>>;

    /// Point HEAD at an existing branch ref path.
    ///
    /// The path must lie under `refs/heads/` and name a valid branch.
    fn update_head(&self, ref_name: &str) -> Result<()> {
        let name = ref_name
            .strip_prefix(BRANCH_PREFIX)
            .ok_or_else(|| RefError::InvalidBranchName {
                name: ref_name.to_string(),
                reason: format!("not under {BRANCH_PREFIX}"),
            })?;
        validate_branch_name(name)?;
        if !self.ref_exists(ref_name)? {
            return Err(RefError::NotFound {
                name: ref_name.to_string(),
            });
        }
        self.write_head(ref_name)?;
        info!(head = ref_name, "updated HEAD");
        Ok(())
    }

    /// Move the ref HEAD names to a new commit.
    fn update_ref(&self, id: &ObjectId) -> Result<()> {
        let head = self.retrieve_head()?;
        self.write_ref(&head, Some(id))?;
        info!(%id, ref_name = %head, "updated ref");
        Ok(())
    }

    /// The commit HEAD resolves to, or `None` before the first commit.
    fn head_commit(&self) -> Result<Option<ObjectId>> {
        let head = self.retrieve_head()?;
        self.read_ref(&head)
    }

    /// The branch HEAD names, if it names one.
    fn current_branch(&self) -> Result<Option<String>> {
        let head = self.retrieve_head()?;
        Ok(head.strip_prefix(BRANCH_PREFIX).map(str::to_string))
    }

    /// Create a branch at the current head commit.
    ///
    /// Before the first commit the new branch is empty, like the current one.
    fn create_branch(&self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        let ref_name = branch_ref(name);
        if self.ref_exists(&ref_name)? {
            return Err(RefError::AlreadyExists { name: ref_name });
        }
        let target = self.head_commit()?;
        self.write_ref(&ref_name, target.as_ref())?;
        info!(branch = name, target = ?target, "created branch");
        Ok(())
    }
}
