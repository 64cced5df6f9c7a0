use serde::{Deserialize, Serialize};
use delta_crypto::{object_header, ObjectHasher};
use delta_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents).
    Blob,
    /// Directory listing: ordered entries mapping names to object references.
    Tree,
    /// Snapshot pointer: root tree, optional parent, author and message.
    Commit,
}

impl ObjectKind {
    /// The type tag written into the object header.
    pub fn tag(&self) -> &'static str {
        self.hasher().tag()
    }

    /// Parse a header type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }

    fn hasher(&self) -> ObjectHasher {
        match self {
            Self::Blob => ObjectHasher::BLOB,
            Self::Tree => ObjectHasher::TREE,
            Self::Commit => ObjectHasher::COMMIT,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A stored object: kind tag + payload bytes + cached size.
///
/// `StoredObject` is the unit of storage. On disk it is framed as
/// `"<kind> <size>\0" + data`; the id is the SHA-1 of that framing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The payload bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    /// The full framed byte form: `"<kind> <size>\0" + data`.
    pub fn to_framed(&self) -> Vec<u8> {
        let mut framed = object_header(self.kind.tag(), self.data.len());
        framed.extend_from_slice(&self.data);
        framed
    }

    /// Decode the framed byte form read back for `id`.
    ///
    /// Validates the type tag and the declared length; hash verification is
    /// left to the caller.
    pub fn from_framed(id: &ObjectId, framed: &[u8]) -> StoreResult<Self> {
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        };

        let nul = framed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| corrupt("missing header terminator"))?;
        let header =
            std::str::from_utf8(&framed[..nul]).map_err(|_| corrupt("header is not text"))?;
        let (tag, len) = header
            .split_once(' ')
            .ok_or_else(|| corrupt("malformed header"))?;
        let kind = ObjectKind::from_tag(tag)
            .ok_or_else(|| corrupt(&format!("unknown object type {tag:?}")))?;
        let len: usize = len
            .parse()
            .map_err(|_| corrupt(&format!("invalid length {len:?}")))?;

        let data = &framed[nul + 1..];
        if data.len() != len {
            return Err(corrupt(&format!(
                "header declares {len} bytes, found {}",
                data.len()
            )));
        }
        Ok(Self::new(kind, data.to_vec()))
    }

    fn expect_kind(&self, kind: ObjectKind) -> StoreResult<()> {
        if self.kind != kind {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {kind}, got {}", self.kind),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Blob)?;
        Ok(Self {
            data: obj.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// File mode for a tree or index entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Non-executable regular file (0o100644).
    Regular,
    /// Executable regular file (0o100755).
    Executable,
    /// Subtree / directory (0o040000).
    Directory,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Directory => 0o040000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o040000 => Some(Self::Directory),
            _ => None,
        }
    }

    /// Mode for a regular file given its executable bit.
    pub fn for_file(executable: bool) -> Self {
        if executable {
            Self::Executable
        } else {
            Self::Regular
        }
    }
}

/// Tree entries render modes as octal without leading zeros (`40000`).
impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.mode_bits())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, directory).
    pub mode: EntryMode,
    /// Entry name (filename or directory name).
    pub name: String,
    /// Content-addressed ID of the referenced object.
    pub object_id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// Directory listing object (analogous to git tree).
///
/// Serialized as the concatenation of `"<mode> <name>\0" + <20 raw id bytes>`
/// for every entry in name order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Sorted entries in this directory.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name for deterministic hashing.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The serialized payload (without the `"tree <len>\0"` header).
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(format!("{} {}\0", entry.mode, entry.name).as_bytes());
            out.extend_from_slice(entry.object_id.as_bytes());
        }
        out
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Tree, self.payload())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Tree)?;
        let corrupt = |reason: String| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason,
        };

        let data = &obj.data;
        let mut entries = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let nul = data[pos..]
                .iter()
                .position(|&b| b == 0)
                .map(|n| pos + n)
                .ok_or_else(|| corrupt(format!("unterminated entry at offset {pos}")))?;
            let text = std::str::from_utf8(&data[pos..nul])
                .map_err(|_| corrupt(format!("entry at offset {pos} is not text")))?;
            let (mode, name) = text
                .split_once(' ')
                .ok_or_else(|| corrupt(format!("malformed entry {text:?}")))?;
            let mode = u32::from_str_radix(mode, 8)
                .ok()
                .and_then(EntryMode::from_mode_bits)
                .ok_or_else(|| corrupt(format!("unknown mode {mode:?}")))?;

            let id_end = nul + 1 + OBJECT_ID_LEN;
            if id_end > data.len() {
                return Err(corrupt(format!("truncated id for entry {name:?}")));
            }
            let object_id = ObjectId::from_slice(&data[nul + 1..id_end])
                .map_err(|e| corrupt(e.to_string()))?;

            entries.push(TreeEntry::new(mode, name, object_id));
            pos = id_end;
        }
        Ok(Self { entries })
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// `strftime` pattern for the commit `Date:` line.
pub const DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %:z";

/// Author metadata recorded in a commit.
///
/// Name and email come from the environment or configuration and are
/// treated as opaque text; the date is kept in its rendered form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: String,
}

impl Signature {
    /// Create a signature with an explicit rendered date.
    pub fn new(name: impl Into<String>, email: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            date: date.into(),
        }
    }

    /// Create a signature stamped with the current local time.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        let date = chrono::Local::now().format(DATE_FORMAT).to_string();
        Self::new(name, email, date)
    }
}

/// Snapshot object: one root tree, an optional parent and metadata.
///
/// A root commit has `parent == None`; there is no sentinel id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    pub parent: Option<ObjectId>,
    pub author: Signature,
    pub message: String,
}

impl Commit {
    /// Create a new commit.
    pub fn new(
        tree: ObjectId,
        parent: Option<ObjectId>,
        author: Signature,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            author,
            message: message.into(),
        }
    }

    /// Returns `true` if this commit has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The serialized payload (without the `"commit <len>\0"` header).
    pub fn payload(&self) -> Vec<u8> {
        let mut text = format!("tree {}\n", self.tree);
        if let Some(parent) = &self.parent {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str(&format!(
            "Author: {} <{}>\nDate:   {}\n{}",
            self.author.name, self.author.email, self.author.date, self.message
        ));
        text.into_bytes()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Commit, self.payload())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.expect_kind(ObjectKind::Commit)?;
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: reason.to_string(),
        };

        let text = std::str::from_utf8(&obj.data).map_err(|_| corrupt("commit is not text"))?;
        let mut rest = text;

        let tree = next_line(&mut rest)
            .and_then(|l| l.strip_prefix("tree "))
            .ok_or_else(|| corrupt("missing tree line"))?;
        let tree = ObjectId::from_hex(tree).map_err(|e| corrupt(&e.to_string()))?;

        let mut line = next_line(&mut rest).ok_or_else(|| corrupt("truncated commit"))?;
        let parent = match line.strip_prefix("parent ") {
            Some(hex) => {
                let parent = ObjectId::from_hex(hex).map_err(|e| corrupt(&e.to_string()))?;
                line = next_line(&mut rest).ok_or_else(|| corrupt("truncated commit"))?;
                Some(parent)
            }
            None => None,
        };

        let author = line
            .strip_prefix("Author: ")
            .ok_or_else(|| corrupt("missing author line"))?;
        let (name, email) = author
            .strip_suffix('>')
            .and_then(|a| a.rsplit_once(" <"))
            .ok_or_else(|| corrupt("malformed author line"))?;

        let date = next_line(&mut rest)
            .and_then(|l| l.strip_prefix("Date:   "))
            .ok_or_else(|| corrupt("missing date line"))?;

        Ok(Self {
            tree,
            parent,
            author: Signature::new(name, email, date),
            message: rest.to_string(),
        })
    }
}

/// Split off the next `\n`-terminated line, advancing `rest` past it.
fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let (line, tail) = rest.split_once('\n')?;
    *rest = tail;
    Some(line)
}
