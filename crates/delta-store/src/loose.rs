//! On-disk loose object store.
//!
//! Every object lives in its own zlib-compressed file at
//! `<root>/<first 2 hex chars>/<remaining 38 hex chars>`. The file holds the
//! compressed form of `"<kind> <len>\0" + payload`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::debug;

use delta_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Default zlib compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Filesystem-backed object store using one compressed file per object.
#[derive(Clone, Debug)]
pub struct LooseObjectStore {
    root: PathBuf,
    compression: Compression,
}

impl LooseObjectStore {
    /// Open a store rooted at `root` with the default compression level.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_compression(root, DEFAULT_COMPRESSION_LEVEL)
    }

    /// Open a store with an explicit zlib level (clamped to 0..=9).
    pub fn with_compression(root: impl Into<PathBuf>, level: u32) -> Self {
        Self {
            root: root.into(),
            compression: Compression::new(level.min(9)),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file that holds (or would hold) `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.fan_out();
        self.root.join(dir).join(file)
    }

    fn compress(&self, framed: &[u8], out: File) -> io::Result<File> {
        let mut encoder = ZlibEncoder::new(out, self.compression);
        encoder.write_all(framed)?;
        encoder.finish()
    }
}

impl ObjectStore for LooseObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let path = self.object_path(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut framed = Vec::new();
        ZlibDecoder::new(file)
            .read_to_end(&mut framed)
            .map_err(|e| StoreError::CorruptObject {
                id: *id,
                reason: format!("decompression failed: {e}"),
            })?;

        let object = StoredObject::from_framed(id, &framed)?;
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);

        if path.exists() {
            debug!(%id, kind = %object.kind, "object already stored");
            return Ok(id);
        }

        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent"))?;
        fs::create_dir_all(dir)?;

        // Compress into a sibling temp file, then link it into place only if
        // no other writer got there first.
        let tmp = NamedTempFile::new_in(dir)?;
        let file = self.compress(&object.to_framed(), tmp.reopen()?)?;
        file.sync_all()?;
        drop(file);

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!(%id, kind = %object.kind, size = object.size, "stored object");
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(%id, "object appeared concurrently; keeping existing file");
            }
            Err(e) => return Err(e.error.into()),
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, ObjectKind};

    fn make_store() -> (tempfile::TempDir, LooseObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn hello_lands_at_fan_out_path() {
        let (_dir, store) = make_store();
        let id = store.store(ObjectKind::Blob, b"hello".to_vec()).unwrap();
        assert_eq!(id.to_hex(), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");

        let path = store
            .root()
            .join("b6")
            .join("fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
        assert!(path.is_file());

        let mut inflated = Vec::new();
        ZlibDecoder::new(File::open(&path).unwrap())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, b"blob 5\0hello".to_vec());
    }

    #[test]
    fn write_then_read() {
        let (_dir, store) = make_store();
        let obj = Blob::new(b"some file content\n".to_vec()).to_stored_object();
        let id = store.write(&obj).unwrap();
        assert!(store.exists(&id).unwrap());
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn second_store_is_a_noop() {
        let (_dir, store) = make_store();
        let id1 = store.store(ObjectKind::Blob, b"dedup me".to_vec()).unwrap();
        let path = store.object_path(&id1);
        let before = fs::read(&path).unwrap();
        let modified_before = fs::metadata(&path).unwrap().modified().unwrap();

        let id2 = store.store(ObjectKind::Blob, b"dedup me".to_vec()).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified_before);

        let files: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(files.len(), 1, "no stray temp files");
    }

    #[test]
    fn read_missing_returns_none() {
        let (_dir, store) = make_store();
        let id = ObjectId::from_raw([0x42; 20]);
        assert!(store.read(&id).unwrap().is_none());
        assert!(!store.exists(&id).unwrap());
    }

    #[test]
    fn read_detects_swapped_content() {
        let (_dir, store) = make_store();
        let a = store.store(ObjectKind::Blob, b"aaa".to_vec()).unwrap();
        let b = store.store(ObjectKind::Blob, b"bbb".to_vec()).unwrap();
        fs::copy(store.object_path(&b), store.object_path(&a)).unwrap();

        let err = store.read(&a).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { computed, .. } if computed == b));
    }

    #[test]
    fn read_rejects_garbage_file() {
        let (_dir, store) = make_store();
        let id = store.store(ObjectKind::Blob, b"x".to_vec()).unwrap();
        fs::write(store.object_path(&id), b"not zlib at all").unwrap();
        let err = store.read(&id).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn unwritable_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("objects");
        fs::write(&blocker, b"a file, not a directory").unwrap();
        let store = LooseObjectStore::new(&blocker);
        let err = store.store(ObjectKind::Blob, b"data".to_vec()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn compression_level_does_not_change_id() {
        let dir = tempfile::tempdir().unwrap();
        let fast = LooseObjectStore::with_compression(dir.path().join("a"), 0);
        let best = LooseObjectStore::with_compression(dir.path().join("b"), 9);
        let payload = b"repeat ".repeat(100);
        let id1 = fast.store(ObjectKind::Blob, payload.clone()).unwrap();
        let id2 = best.store(ObjectKind::Blob, payload).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(fast.read(&id1).unwrap(), best.read(&id2).unwrap());
    }
}
