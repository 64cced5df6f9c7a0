//! Filesystem-backed reference store.
//!
//! HEAD is the file `<root>/HEAD` holding a ref path; every ref is the file
//! `<root>/<ref path>` holding a 40-hex commit id, or nothing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use delta_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::names::{branch_ref, validate_branch_name, BRANCH_PREFIX};
use crate::traits::RefStore;

const HEAD_FILE: &str = "HEAD";

/// A [`RefStore`] over plain text files in the repository directory.
#[derive(Clone, Debug)]
pub struct FileRefStore {
    root: PathBuf,
}

impl FileRefStore {
    /// Open the ref store rooted at the repository directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `refs/heads/` and point HEAD at `default_branch`.
    ///
    /// The branch itself is not created; it comes into existence with the
    /// first commit.
    pub fn init(root: impl Into<PathBuf>, default_branch: &str) -> Result<Self> {
        validate_branch_name(default_branch)?;
        let store = Self::new(root);
        fs::create_dir_all(store.root.join(BRANCH_PREFIX))?;
        store.write_head(&branch_ref(default_branch))?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_path(&self, ref_name: &str) -> PathBuf {
        self.root.join(ref_name)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn collect_branches(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                self.collect_branches(&entry.path(), &format!("{prefix}{name}/"), out)?;
            } else {
                out.push(format!("{prefix}{name}"));
            }
        }
        Ok(())
    }
}

impl RefStore for FileRefStore {
    fn retrieve_head(&self) -> Result<String> {
        match fs::read_to_string(self.root.join(HEAD_FILE)) {
            Ok(head) => Ok(head.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RefError::NotFound {
                name: HEAD_FILE.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write_head(&self, ref_name: &str) -> Result<()> {
        self.write_atomic(&self.root.join(HEAD_FILE), ref_name.as_bytes())?;
        debug!(head = ref_name, "wrote HEAD");
        Ok(())
    }

    fn ref_exists(&self, ref_name: &str) -> Result<bool> {
        Ok(self.ref_path(ref_name).is_file())
    }

    fn read_ref(&self, ref_name: &str) -> Result<Option<ObjectId>> {
        let contents = match fs::read_to_string(self.ref_path(ref_name)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let hex = contents.trim();
        if hex.is_empty() {
            return Ok(None);
        }
        ObjectId::from_hex(hex)
            .map(Some)
            .map_err(|e| RefError::InvalidTarget {
                name: ref_name.to_string(),
                reason: e.to_string(),
            })
    }

    fn write_ref(&self, ref_name: &str, id: Option<&ObjectId>) -> Result<()> {
        let contents = id.map(ObjectId::to_hex).unwrap_or_default();
        self.write_atomic(&self.ref_path(ref_name), contents.as_bytes())?;
        debug!(ref_name, target = %contents, "wrote ref");
        Ok(())
    }

    fn branches(&self) -> Result<Vec<String>> {
        let heads = self.root.join(BRANCH_PREFIX);
        let mut names = Vec::new();
        match self.collect_branches(&heads, "", &mut names) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        names.sort();
        Ok(names)
    }
}
