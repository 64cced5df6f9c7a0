use delta_types::{ObjectId, OBJECT_ID_LEN};
use sha1::{Digest, Sha1};

/// Type-tagged SHA-1 content hasher.
///
/// Each hasher carries an object type tag (`"blob"`, `"tree"`, `"commit"`).
/// The id of a payload is the digest of `"<tag> <len>\0"` followed by the
/// payload itself, so a blob and a tree with identical bytes never share an
/// id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHasher {
    tag: &'static str,
}

impl ObjectHasher {
    /// Hasher for blob objects.
    pub const BLOB: Self = Self { tag: "blob" };
    /// Hasher for tree objects.
    pub const TREE: Self = Self { tag: "tree" };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self { tag: "commit" };

    /// The type tag used by this hasher.
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The `"<tag> <len>\0"` header for a payload of `len` bytes.
    pub fn header(&self, len: usize) -> Vec<u8> {
        object_header(self.tag, len)
    }

    /// Hash a payload with its type header.
    pub fn hash(&self, payload: &[u8]) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.header(payload.len()));
        hasher.update(payload);
        ObjectId::from_raw(hasher.finalize().into())
    }

    /// Verify that a payload produces the expected object id.
    pub fn verify(&self, payload: &[u8], expected: &ObjectId) -> bool {
        self.hash(payload) == *expected
    }
}

/// Build the `"<tag> <len>\0"` header that prefixes every stored object.
pub fn object_header(tag: &str, len: usize) -> Vec<u8> {
    format!("{tag} {len}\0").into_bytes()
}

/// Plain SHA-1 digest of a buffer, without any type header.
///
/// Used for the trailing checksum of the staging index.
pub fn checksum(data: &[u8]) -> [u8; OBJECT_ID_LEN] {
    Sha1::digest(data).into()
}
