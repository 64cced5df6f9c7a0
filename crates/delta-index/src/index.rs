//! The on-disk staging index.
//!
//! File layout (all integers big-endian):
//!
//! ```text
//! "DIRC" | version (u32 = 2) | entry count (u32) | entries... | SHA-1 (20)
//! ```
//!
//! Entries are sorted by path and use the padded layout described in
//! [`crate::entry`]. The trailing SHA-1 covers every preceding byte and is
//! checked before anything else is read.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use delta_crypto::checksum;
use delta_store::EntryMode;
use delta_types::{ObjectId, OBJECT_ID_LEN};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::entry::{be_u32, validate_path, IndexEntry, ENTRY_METADATA_LEN};
use crate::error::{IndexError, IndexResult};
use crate::workdir::WorkingCopy;

/// Signature at the start of every index file.
pub const INDEX_SIGNATURE: &[u8; 4] = b"DIRC";
/// The only supported format version.
pub const INDEX_VERSION: u32 = 2;

const HEADER_LEN: usize = 12;

/// How many records a call to [`StagingIndex::add`] wrote fresh and how many it
/// carried over byte for byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddSummary {
    pub recomputed: usize,
    pub reused: usize,
}

/// A tracked path as seen by tree construction: staged id plus the mode the
/// working copy has right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedFile {
    pub object_id: ObjectId,
    pub mode: EntryMode,
}

/// A decoded entry together with the exact bytes it was read from (or will
/// be written as).
#[derive(Clone, Debug)]
struct Slot {
    entry: IndexEntry,
    raw: Vec<u8>,
}

impl Slot {
    fn fresh(entry: IndexEntry) -> Self {
        let raw = entry.encode();
        Self { entry, raw }
    }
}

/// The staging index: tracked paths in path order, bound to its file.
#[derive(Clone, Debug)]
pub struct StagingIndex {
    path: PathBuf,
    slots: BTreeMap<String, Slot>,
}

impl StagingIndex {
    /// An empty index that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Load the index at `path`; a missing file is an empty index.
    pub fn load(path: impl Into<PathBuf>) -> IndexResult<Self> {
        let path = path.into();
        match fs::read(&path) {
            Ok(data) => Self::from_bytes(path, &data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index file; starting empty");
                Ok(Self::new(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Decode index bytes, verifying the checksum before anything else.
    pub fn from_bytes(path: impl Into<PathBuf>, data: &[u8]) -> IndexResult<Self> {
        if data.len() < HEADER_LEN + OBJECT_ID_LEN {
            return Err(IndexError::Corrupt(format!(
                "index of {} bytes is too short",
                data.len()
            )));
        }

        let body_end = data.len() - OBJECT_ID_LEN;
        let (body, stored) = data.split_at(body_end);
        let computed = checksum(body);
        if computed[..] != stored[..] {
            return Err(IndexError::ChecksumMismatch {
                stored: hex::encode(stored),
                computed: hex::encode(computed),
            });
        }

        if &body[0..4] != INDEX_SIGNATURE {
            return Err(IndexError::Corrupt(format!(
                "bad signature {:?}",
                String::from_utf8_lossy(&body[0..4])
            )));
        }
        let version = be_u32(body, 4);
        if version != INDEX_VERSION {
            return Err(IndexError::Corrupt(format!("unsupported version {version}")));
        }
        let count = be_u32(body, 8) as usize;

        let mut slots = BTreeMap::new();
        let mut start = HEADER_LEN;
        for n in 0..count {
            // Records are a multiple of 8 long and end in NUL, so probe the
            // last byte of each 8-byte block after the metadata.
            let mut last = start + ENTRY_METADATA_LEN + 1;
            loop {
                if last >= body.len() {
                    return Err(IndexError::Corrupt(format!("entry {n} is truncated")));
                }
                if body[last] == 0 {
                    break;
                }
                last += 8;
            }

            let raw = body[start..=last].to_vec();
            let entry = IndexEntry::decode(&raw)?;
            slots.insert(entry.path.clone(), Slot { entry, raw });
            start = last + 1;
        }
        if start != body.len() {
            return Err(IndexError::Corrupt(format!(
                "{} unexpected bytes after {count} entries",
                body.len() - start
            )));
        }

        let path = path.into();
        debug!(path = %path.display(), entries = slots.len(), "loaded index");
        Ok(Self { path, slots })
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Look up the entry for a path.
    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.slots.get(path).map(|slot| &slot.entry)
    }

    /// The staged object id for a path.
    pub fn object_id(&self, path: &str) -> IndexResult<ObjectId> {
        self.get(path)
            .map(|entry| entry.object_id)
            .ok_or_else(|| IndexError::PathNotFound(path.to_string()))
    }

    /// The encoded record for a path, exactly as it will be saved.
    pub fn raw_entry(&self, path: &str) -> Option<&[u8]> {
        self.slots.get(path).map(|slot| slot.raw.as_slice())
    }

    /// Tracked paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.slots.values().map(|slot| &slot.entry)
    }

    /// Merge `path -> object id` pairs into the index and save it.
    ///
    /// Paths whose id is unchanged keep their previous record byte for byte.
    /// New paths and paths with a different id get a fresh record built from
    /// the working copy's current metadata. An empty batch leaves the index
    /// and its file untouched.
    pub fn add(
        &mut self,
        staged: &BTreeMap<String, ObjectId>,
        working_copy: &dyn WorkingCopy,
    ) -> IndexResult<AddSummary> {
        if staged.is_empty() {
            return Ok(AddSummary::default());
        }

        let mut fresh = BTreeMap::new();
        for (path, id) in staged {
            validate_path(path)?;
            if self.get(path).is_some_and(|entry| entry.object_id == *id) {
                continue;
            }
            let stat = working_copy.stat(path)?;
            fresh.insert(path.clone(), Slot::fresh(IndexEntry::from_stat(path, *id, &stat)));
        }

        let recomputed = fresh.len();
        self.slots.extend(fresh);
        self.save()?;
        let summary = AddSummary {
            recomputed,
            reused: self.slots.len() - recomputed,
        };
        info!(
            entries = self.slots.len(),
            summary.recomputed,
            summary.reused,
            "updated index"
        );
        Ok(summary)
    }

    /// Serialize header, sorted entries and trailing checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            HEADER_LEN + self.slots.values().map(|s| s.raw.len()).sum::<usize>() + OBJECT_ID_LEN,
        );
        out.extend_from_slice(INDEX_SIGNATURE);
        out.extend_from_slice(&INDEX_VERSION.to_be_bytes());
        out.extend_from_slice(&(self.slots.len() as u32).to_be_bytes());
        for slot in self.slots.values() {
            out.extend_from_slice(&slot.raw);
        }
        let sum = checksum(&out);
        out.extend_from_slice(&sum);
        out
    }

    /// Atomically replace the index file with the current contents.
    pub fn save(&self) -> IndexResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.to_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), entries = self.slots.len(), "saved index");
        Ok(())
    }

    /// Project every tracked path to its staged id and current mode.
    ///
    /// The mode comes from the working copy at call time rather than from the
    /// stored record; a path that can no longer be inspected counts as a
    /// regular file.
    pub fn fetch_index_data(&self, working_copy: &dyn WorkingCopy) -> BTreeMap<String, TrackedFile> {
        self.slots
            .iter()
            .map(|(path, slot)| {
                let executable = working_copy.is_executable(path).unwrap_or(false);
                let tracked = TrackedFile {
                    object_id: slot.entry.object_id,
                    mode: EntryMode::for_file(executable),
                };
                (path.clone(), tracked)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workdir::FsWorkingCopy;

    struct Fixture {
        dir: tempfile::TempDir,
        wc: FsWorkingCopy,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let wc = FsWorkingCopy::new(dir.path());
            Self { dir, wc }
        }

        fn write(&self, path: &str, content: &[u8]) {
            let full = self.dir.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }

        fn index_path(&self) -> PathBuf {
            self.dir.path().join("index")
        }
    }

    fn oid(n: u8) -> ObjectId {
        ObjectId::from_raw([n; 20])
    }

    fn batch(pairs: &[(&str, ObjectId)]) -> BTreeMap<String, ObjectId> {
        pairs.iter().map(|(p, id)| (p.to_string(), *id)).collect()
    }

    #[test]
    fn missing_file_loads_empty() {
        let fx = Fixture::new();
        let index = StagingIndex::load(fx.index_path()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn add_then_fresh_load_returns_same_entries() {
        let fx = Fixture::new();
        fx.write("b.txt", b"bee");
        fx.write("a.txt", b"a");
        fx.write("dir/c.txt", b"sea");

        let mut index = StagingIndex::new(fx.index_path());
        index
            .add(
                &batch(&[("b.txt", oid(2)), ("a.txt", oid(1)), ("dir/c.txt", oid(3))]),
                &fx.wc,
            )
            .unwrap();

        let loaded = StagingIndex::load(fx.index_path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.paths().collect::<Vec<_>>(), ["a.txt", "b.txt", "dir/c.txt"]);
        assert_eq!(loaded.object_id("b.txt").unwrap(), oid(2));
        assert_eq!(loaded.get("dir/c.txt").unwrap().size, 3);
        for path in ["a.txt", "b.txt", "dir/c.txt"] {
            assert_eq!(loaded.raw_entry(path), index.raw_entry(path));
        }
    }

    #[test]
    fn header_layout() {
        let fx = Fixture::new();
        fx.write("f", b"x");
        let mut index = StagingIndex::new(fx.index_path());
        index.add(&batch(&[("f", oid(1))]), &fx.wc).unwrap();

        let data = fs::read(fx.index_path()).unwrap();
        assert_eq!(&data[0..4], b"DIRC");
        assert_eq!(&data[4..8], &2u32.to_be_bytes());
        assert_eq!(&data[8..12], &1u32.to_be_bytes());
        // 62 + 1 = 63 -> 64 byte record
        assert_eq!(data.len(), 12 + 64 + 20);
        assert_eq!(&data[data.len() - 20..], &checksum(&data[..data.len() - 20]));
    }

    #[test]
    fn unchanged_ids_reuse_raw_records() {
        let fx = Fixture::new();
        fx.write("keep.txt", b"stable");
        fx.write("edit.txt", b"v1");

        let mut index = StagingIndex::new(fx.index_path());
        index
            .add(&batch(&[("keep.txt", oid(1)), ("edit.txt", oid(2))]), &fx.wc)
            .unwrap();
        let keep_before = index.raw_entry("keep.txt").unwrap().to_vec();

        // Both files change on disk, but only edit.txt is restaged with a new id.
        fx.write("keep.txt", b"stable but longer now");
        fx.write("edit.txt", b"version two");
        let mut reloaded = StagingIndex::load(fx.index_path()).unwrap();
        reloaded
            .add(&batch(&[("keep.txt", oid(1)), ("edit.txt", oid(3))]), &fx.wc)
            .unwrap();

        let after = StagingIndex::load(fx.index_path()).unwrap();
        assert_eq!(after.raw_entry("keep.txt").unwrap(), keep_before.as_slice());
        assert_eq!(after.get("keep.txt").unwrap().size, 6);
        assert_eq!(after.object_id("edit.txt").unwrap(), oid(3));
        assert_eq!(after.get("edit.txt").unwrap().size, 11);
    }

    #[test]
    fn add_merges_with_existing_paths() {
        let fx = Fixture::new();
        fx.write("one", b"1");
        fx.write("two", b"2");

        let mut index = StagingIndex::new(fx.index_path());
        index.add(&batch(&[("one", oid(1))]), &fx.wc).unwrap();
        let mut index = StagingIndex::load(fx.index_path()).unwrap();
        let summary = index.add(&batch(&[("two", oid(2))]), &fx.wc).unwrap();
        assert_eq!(summary, AddSummary { recomputed: 1, reused: 1 });

        let loaded = StagingIndex::load(fx.index_path()).unwrap();
        assert_eq!(loaded.paths().collect::<Vec<_>>(), ["one", "two"]);
    }

    #[test]
    fn empty_add_does_not_create_file() {
        let fx = Fixture::new();
        let mut index = StagingIndex::new(fx.index_path());
        index.add(&BTreeMap::new(), &fx.wc).unwrap();
        assert!(!fx.index_path().exists());
    }

    #[test]
    fn every_single_byte_flip_is_detected() {
        let fx = Fixture::new();
        fx.write("a", b"a");
        fx.write("nested/b", b"b");
        let mut index = StagingIndex::new(fx.index_path());
        index
            .add(&batch(&[("a", oid(1)), ("nested/b", oid(2))]), &fx.wc)
            .unwrap();
        let data = fs::read(fx.index_path()).unwrap();

        for i in 0..data.len() {
            let mut flipped = data.clone();
            flipped[i] ^= 0x01;
            let err = StagingIndex::from_bytes(fx.index_path(), &flipped).unwrap_err();
            assert!(
                matches!(err, IndexError::ChecksumMismatch { .. }),
                "flip at byte {i} not detected"
            );
        }
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let err = StagingIndex::from_bytes("index", b"DIRC\0\0\0\x02").unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn bad_signature_with_valid_checksum_is_corrupt() {
        let mut body = b"XXXX".to_vec();
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        let sum = checksum(&body);
        body.extend_from_slice(&sum);
        let err = StagingIndex::from_bytes("index", &body).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn overstated_entry_count_is_corrupt() {
        let fx = Fixture::new();
        fx.write("a", b"a");
        let mut index = StagingIndex::new(fx.index_path());
        index.add(&batch(&[("a", oid(1))]), &fx.wc).unwrap();

        let mut data = fs::read(fx.index_path()).unwrap();
        data.truncate(data.len() - 20);
        data[8..12].copy_from_slice(&2u32.to_be_bytes());
        let sum = checksum(&data);
        data.extend_from_slice(&sum);
        let err = StagingIndex::from_bytes(fx.index_path(), &data).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn add_rejects_unrepresentable_paths() {
        let fx = Fixture::new();
        let mut index = StagingIndex::new(fx.index_path());
        let err = index
            .add(&batch(&[("r\u{e9}sum\u{e9}.txt", oid(1))]), &fx.wc)
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidPath(_)));
    }

    #[test]
    fn add_of_missing_file_is_io_error() {
        let fx = Fixture::new();
        let mut index = StagingIndex::new(fx.index_path());
        let err = index.add(&batch(&[("ghost", oid(1))]), &fx.wc).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
        assert!(!fx.index_path().exists());
    }

    #[test]
    fn unknown_path_lookup_is_not_found() {
        let index = StagingIndex::new("index");
        assert!(matches!(
            index.object_id("nope"),
            Err(IndexError::PathNotFound(p)) if p == "nope"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn fetch_index_data_reads_mode_from_working_copy() {
        use std::os::unix::fs::PermissionsExt;

        let fx = Fixture::new();
        fx.write("run.sh", b"#!/bin/sh\n");
        fx.write("gone.txt", b"bye");
        let mut index = StagingIndex::new(fx.index_path());
        index
            .add(&batch(&[("run.sh", oid(1)), ("gone.txt", oid(2))]), &fx.wc)
            .unwrap();
        assert_eq!(index.get("run.sh").unwrap().mode, EntryMode::Regular);

        fs::set_permissions(
            fx.dir.path().join("run.sh"),
            fs::Permissions::from_mode(0o755),
        )
        .unwrap();
        fs::remove_file(fx.dir.path().join("gone.txt")).unwrap();

        let data = StagingIndex::load(fx.index_path())
            .unwrap()
            .fetch_index_data(&fx.wc);
        assert_eq!(
            data["run.sh"],
            TrackedFile {
                object_id: oid(1),
                mode: EntryMode::Executable
            }
        );
        assert_eq!(data["gone.txt"].mode, EntryMode::Regular);
        assert_eq!(data["gone.txt"].object_id, oid(2));
    }
}
