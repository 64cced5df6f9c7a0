//! Recursive tree construction from a flat path mapping.
//!
//! [`TreeBuilder`] accepts `path -> (blob id, mode)` insertions and groups
//! them by their first path segment into nested subtree nodes. Each node owns
//! its children outright, so the structure is a plain recursive tree with no
//! shared or back references.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use delta_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{EntryMode, StoredObject, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// A child of a [`TreeBuilder`] node.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Blob { id: ObjectId, mode: EntryMode },
    Subtree(TreeBuilder),
}

/// In-memory directory hierarchy awaiting persistence.
///
/// Children are keyed by name in a `BTreeMap`, so serialization order is the
/// lexicographic name order regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeBuilder {
    children: BTreeMap<String, Node>,
}

impl TreeBuilder {
    /// Create an empty builder (the repository root).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hierarchy from `(path, id, mode)` triples.
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, ObjectId, EntryMode)>,
        P: AsRef<str>,
    {
        let mut builder = Self::new();
        for (path, id, mode) in entries {
            builder.insert(path.as_ref(), id, mode);
        }
        builder
    }

    /// Insert a blob at a `/`-separated path.
    ///
    /// A path without a separator names a direct child blob. Otherwise the
    /// first segment names a subtree that receives the remainder of the path;
    /// paths sharing a first segment accumulate in the same subtree. A later
    /// insertion replaces an earlier node of the other kind under the same
    /// name.
    pub fn insert(&mut self, path: &str, id: ObjectId, mode: EntryMode) {
        match path.split_once('/') {
            None => {
                if let Some(Node::Subtree(_)) = self.children.get(path) {
                    warn!(path, "blob replaces existing subtree");
                }
                self.children.insert(path.to_string(), Node::Blob { id, mode });
            }
            Some((head, rest)) => {
                let node = self
                    .children
                    .entry(head.to_string())
                    .or_insert_with(|| Node::Subtree(TreeBuilder::new()));
                if matches!(node, Node::Blob { .. }) {
                    warn!(path = head, "subtree replaces existing blob");
                    *node = Node::Subtree(TreeBuilder::new());
                }
                if let Node::Subtree(subtree) = node {
                    subtree.insert(rest, id, mode);
                }
            }
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the node has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The tree object for this node, with subtree ids computed (not stored).
    pub fn to_tree(&self) -> Tree {
        let entries = self
            .children
            .iter()
            .map(|(name, node)| match node {
                Node::Blob { id, mode } => TreeEntry::new(*mode, name, *id),
                Node::Subtree(subtree) => TreeEntry::new(EntryMode::Directory, name, subtree.id()),
            })
            .collect();
        Tree::new(entries)
    }

    /// The full object bytes: `"tree <len>\0"` followed by the entries.
    pub fn content(&self) -> Vec<u8> {
        self.to_tree().to_stored_object().to_framed()
    }

    /// The content-addressed id of this node.
    pub fn id(&self) -> ObjectId {
        self.to_tree().to_stored_object().compute_id()
    }

    /// Persist the whole hierarchy depth-first and return the root tree id.
    ///
    /// Children are stored before their parent, since a parent's bytes embed
    /// its children's ids. Nodes already present in the store are no-ops.
    pub fn generate(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        let mut entries = Vec::with_capacity(self.children.len());
        for (name, node) in &self.children {
            let entry = match node {
                Node::Blob { id, mode } => TreeEntry::new(*mode, name, *id),
                Node::Subtree(subtree) => {
                    TreeEntry::new(EntryMode::Directory, name, subtree.generate(store)?)
                }
            };
            entries.push(entry);
        }

        let stored: StoredObject = Tree::new(entries).to_stored_object();
        let id = store.write(&stored)?;
        debug!(%id, entries = self.children.len(), "generated tree");
        Ok(id)
    }
}
