//! Fixed-layout index entry records.
//!
//! An encoded entry is 62 bytes of big-endian metadata, the path bytes, and
//! one to eight NUL bytes of padding bringing the length to a multiple of 8:
//!
//! ```text
//!  0  ctime seconds      4     24  mode            4
//!  4  ctime nanoseconds  4     28  uid             4
//!  8  mtime seconds      4     32  gid             4
//! 12  mtime nanoseconds  4     36  size            4
//! 16  device             4     40  object id      20
//! 20  inode              4     60  path length     2
//! ```

use delta_store::EntryMode;
use delta_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{IndexError, IndexResult};
use crate::workdir::FileStat;

/// Length of the fixed metadata block preceding the path.
pub const ENTRY_METADATA_LEN: usize = 62;

const ID_OFFSET: usize = 40;
const PATH_LEN_OFFSET: usize = ID_OFFSET + OBJECT_ID_LEN;
const MAX_PATH_LEN_FIELD: usize = 0xFFFF;

/// A tracked path with its cached working-copy metadata.
///
/// Numeric metadata is truncated to its low 32 bits, matching the on-disk
/// field widths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime_secs: u32,
    pub ctime_nanos: u32,
    pub mtime_secs: u32,
    pub mtime_nanos: u32,
    pub dev: u32,
    pub ino: u32,
    /// Either [`EntryMode::Regular`] or [`EntryMode::Executable`].
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    /// Id of the staged blob.
    pub object_id: ObjectId,
    /// Repository-relative path.
    pub path: String,
}

impl IndexEntry {
    /// Build an entry from freshly captured working-copy metadata.
    pub fn from_stat(path: impl Into<String>, object_id: ObjectId, stat: &FileStat) -> Self {
        Self {
            ctime_secs: stat.ctime_secs as u32,
            ctime_nanos: stat.ctime_nanos as u32,
            mtime_secs: stat.mtime_secs as u32,
            mtime_nanos: stat.mtime_nanos as u32,
            dev: stat.dev as u32,
            ino: stat.ino as u32,
            mode: EntryMode::for_file(stat.executable),
            uid: stat.uid,
            gid: stat.gid,
            size: stat.size as u32,
            object_id,
            path: path.into(),
        }
    }

    /// Encode into the padded on-disk record.
    pub fn encode(&self) -> Vec<u8> {
        let path = self.path.as_bytes();
        let unpadded = ENTRY_METADATA_LEN + path.len();
        let mut out = Vec::with_capacity(padded_len(unpadded));

        for field in [
            self.ctime_secs,
            self.ctime_nanos,
            self.mtime_secs,
            self.mtime_nanos,
            self.dev,
            self.ino,
            self.mode.mode_bits(),
            self.uid,
            self.gid,
            self.size,
        ] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        out.extend_from_slice(self.object_id.as_bytes());
        let name_len = path.len().min(MAX_PATH_LEN_FIELD) as u16;
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(path);
        out.resize(padded_len(unpadded), 0);
        out
    }

    /// Decode one padded record as delimited by the index loader.
    ///
    /// The path is everything after the metadata block with trailing NULs
    /// removed; the stored path length is not consulted, since it saturates
    /// for long paths.
    pub fn decode(record: &[u8]) -> IndexResult<Self> {
        if record.len() <= ENTRY_METADATA_LEN {
            return Err(IndexError::Corrupt(format!(
                "entry of {} bytes is shorter than its metadata",
                record.len()
            )));
        }

        let field = |n: usize| be_u32(record, n * 4);
        let mode_bits = field(6);
        let mode = match EntryMode::from_mode_bits(mode_bits) {
            Some(mode @ (EntryMode::Regular | EntryMode::Executable)) => mode,
            _ => {
                return Err(IndexError::Corrupt(format!(
                    "invalid entry mode {mode_bits:o}"
                )))
            }
        };

        let object_id = ObjectId::from_slice(&record[ID_OFFSET..PATH_LEN_OFFSET])
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;

        let mut path = &record[ENTRY_METADATA_LEN..];
        while let [rest @ .., 0] = path {
            path = rest;
        }
        if !path.is_ascii() || path.contains(&0) {
            return Err(IndexError::Corrupt(format!(
                "entry path is not ASCII text: {}",
                String::from_utf8_lossy(path)
            )));
        }
        let path = String::from_utf8_lossy(path).into_owned();

        Ok(Self {
            ctime_secs: field(0),
            ctime_nanos: field(1),
            mtime_secs: field(2),
            mtime_nanos: field(3),
            dev: field(4),
            ino: field(5),
            mode,
            uid: field(7),
            gid: field(8),
            size: field(9),
            object_id,
            path,
        })
    }
}

/// Check that a path can be stored and later re-delimited by the loader.
///
/// Paths are written one byte per character, and the loader finds the end of
/// each record by scanning for NUL bytes, so only non-empty ASCII paths
/// without NULs are accepted.
pub fn validate_path(path: &str) -> IndexResult<()> {
    if path.is_empty() {
        return Err(IndexError::InvalidPath("empty path".to_string()));
    }
    if !path.is_ascii() || path.contains('\0') {
        return Err(IndexError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Record length after padding: the next multiple of 8 strictly greater than
/// `unpadded`, so at least one NUL always follows the path.
pub fn padded_len(unpadded: usize) -> usize {
    unpadded + (8 - unpadded % 8)
}

pub(crate) fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(path: &str) -> IndexEntry {
        IndexEntry {
            ctime_secs: 1_700_000_000,
            ctime_nanos: 123,
            mtime_secs: 1_700_000_001,
            mtime_nanos: 456,
            dev: 2049,
            ino: 987_654,
            mode: EntryMode::Regular,
            uid: 1000,
            gid: 1000,
            size: 42,
            object_id: ObjectId::from_raw([0xab; 20]),
            path: path.to_string(),
        }
    }

    #[test]
    fn layout_of_encoded_entry() {
        let bytes = sample("src/main.rs").encode();
        assert_eq!(&bytes[0..4], &1_700_000_000u32.to_be_bytes());
        assert_eq!(&bytes[24..28], &0o100644u32.to_be_bytes());
        assert_eq!(&bytes[36..40], &42u32.to_be_bytes());
        assert_eq!(&bytes[40..60], &[0xab; 20]);
        assert_eq!(&bytes[60..62], &11u16.to_be_bytes());
        assert_eq!(&bytes[62..73], b"src/main.rs");
        // 62 + 11 = 73 -> 80
        assert_eq!(bytes.len(), 80);
        assert!(bytes[73..].iter().all(|&b| b == 0));
    }

    #[test]
    fn aligned_entry_gets_a_full_block_of_padding() {
        // 62 + 2 = 64 is already aligned.
        let bytes = sample("ab").encode();
        assert_eq!(bytes.len(), 72);
        assert!(bytes[64..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_reads_back_fields() {
        let mut entry = sample("bin/tool");
        entry.mode = EntryMode::Executable;
        let decoded = IndexEntry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn long_paths_saturate_the_length_field() {
        let path = "a".repeat(70_000);
        let bytes = sample(&path).encode();
        assert_eq!(&bytes[60..62], &[0xff, 0xff]);
        assert_eq!(IndexEntry::decode(&bytes).unwrap().path, path);
    }

    #[test]
    fn decode_rejects_directory_mode() {
        let mut bytes = sample("x").encode();
        bytes[24..28].copy_from_slice(&0o040000u32.to_be_bytes());
        assert!(matches!(
            IndexEntry::decode(&bytes),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn decode_rejects_short_record() {
        assert!(IndexEntry::decode(&[0u8; 40]).is_err());
    }

    #[test]
    fn from_stat_truncates_and_sets_mode() {
        let stat = FileStat {
            size: (1u64 << 32) + 7,
            executable: true,
            ..FileStat::default()
        };
        let entry = IndexEntry::from_stat("run.sh", ObjectId::from_raw([1; 20]), &stat);
        assert_eq!(entry.size, 7);
        assert_eq!(entry.mode, EntryMode::Executable);
    }

    #[test]
    fn path_validation() {
        assert!(validate_path("dir/file.txt").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("caf\u{e9}.txt").is_err());
        assert!(validate_path("nul\0byte").is_err());
    }

    proptest! {
        #[test]
        fn padding_is_between_one_and_eight_bytes(path in "[a-z/._-]{1,64}") {
            let bytes = sample(&path).encode();
            let unpadded = ENTRY_METADATA_LEN + path.len();
            prop_assert_eq!(bytes.len() % 8, 0);
            let padding = bytes.len() - unpadded;
            prop_assert!((1..=8).contains(&padding));
            if unpadded % 8 == 0 {
                prop_assert_eq!(padding, 8);
            }
            prop_assert_eq!(bytes[bytes.len() - 1], 0);
        }
    }
}
