//! Working-copy access for building fresh index entries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// POSIX-style metadata captured for an index entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileStat {
    pub ctime_secs: i64,
    pub ctime_nanos: i64,
    pub mtime_secs: i64,
    pub mtime_nanos: i64,
    pub dev: u64,
    pub ino: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub executable: bool,
}

impl FileStat {
    /// Capture the metadata of a file on disk.
    #[cfg(unix)]
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            ctime_secs: meta.ctime(),
            ctime_nanos: meta.ctime_nsec(),
            mtime_secs: meta.mtime(),
            mtime_nanos: meta.mtime_nsec(),
            dev: meta.dev(),
            ino: meta.ino(),
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size(),
            executable: meta.mode() & 0o111 != 0,
        }
    }

    /// Capture the metadata of a file on disk.
    ///
    /// Only the modify time and size are available on this platform.
    #[cfg(not(unix))]
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .unwrap_or_default();
        Self {
            mtime_secs: mtime.as_secs() as i64,
            mtime_nanos: i64::from(mtime.subsec_nanos()),
            size: meta.len(),
            ..Self::default()
        }
    }
}

/// A path-keyed provider of file bytes and metadata.
///
/// Paths are repository-relative and `/`-separated.
pub trait WorkingCopy {
    /// Read the full contents of a file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Current metadata of a file.
    fn stat(&self, path: &str) -> io::Result<FileStat>;

    /// Whether the file is currently executable.
    fn is_executable(&self, path: &str) -> io::Result<bool> {
        Ok(self.stat(path)?.executable)
    }
}

/// A working copy rooted at a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsWorkingCopy {
    root: PathBuf,
}

impl FsWorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a repository-relative path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl WorkingCopy for FsWorkingCopy {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let meta = fs::metadata(self.resolve(path))?;
        Ok(FileStat::from_metadata(&meta))
    }
}
