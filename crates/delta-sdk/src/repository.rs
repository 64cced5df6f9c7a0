use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info};

use delta_diff::{diff_blobs, LineDiff};
use delta_index::{FsWorkingCopy, IndexError, StagingIndex, WorkingCopy};
use delta_refs::{branch_ref, validate_branch_name, FileRefStore, RefError, RefStore};
use delta_store::{
    Blob, Commit, LooseObjectStore, ObjectKind, ObjectStore, Signature, Tree, TreeBuilder,
};
use delta_types::ObjectId;

use crate::config::RepoConfig;
use crate::error::{SdkError, SdkResult};

/// Name of the repository directory inside the working copy.
pub const REPO_DIR: &str = ".delta";
/// Per-directory ignore file honoured when adding directories.
pub const IGNORE_FILE: &str = ".deltaignore";

const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index";
const CONFIG_FILE: &str = "config.toml";
const HEAD_FILE: &str = "HEAD";

/// One commit in history order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub id: ObjectId,
    pub commit: Commit,
}

/// A working copy and its `.delta` directory.
///
/// Holds everything an operation needs: the object store, the ref store, the
/// index location and the configuration. Nothing is process-global.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    dir: PathBuf,
    config: RepoConfig,
    store: LooseObjectStore,
    refs: FileRefStore,
    working_copy: FsWorkingCopy,
}

impl Repository {
    /// Create a repository in `root` with the default configuration.
    pub fn init(root: impl AsRef<Path>) -> SdkResult<Self> {
        Self::init_with_config(root, RepoConfig::default())
    }

    /// Create a repository in `root`, writing `config` to `.delta/config.toml`.
    pub fn init_with_config(root: impl AsRef<Path>, config: RepoConfig) -> SdkResult<Self> {
        let root = root.as_ref();
        let dir = root.join(REPO_DIR);
        if dir.join(HEAD_FILE).exists() {
            return Err(SdkError::AlreadyInitialized(root.to_path_buf()));
        }

        fs::create_dir_all(dir.join(OBJECTS_DIR))?;
        FileRefStore::init(&dir, &config.core.default_branch)?;
        config.save(&dir.join(CONFIG_FILE))?;
        info!(root = %root.display(), branch = %config.core.default_branch, "initialized repository");

        Self::open(root)
    }

    /// Open the repository whose working copy is `root`.
    pub fn open(root: impl AsRef<Path>) -> SdkResult<Self> {
        let root = root.as_ref();
        let dir = root.join(REPO_DIR);
        if !dir.join(HEAD_FILE).is_file() {
            return Err(SdkError::NotInitialized(root.to_path_buf()));
        }

        let root = fs::canonicalize(root)?;
        let dir = root.join(REPO_DIR);
        let config = RepoConfig::load(&dir.join(CONFIG_FILE))?;
        let store =
            LooseObjectStore::with_compression(dir.join(OBJECTS_DIR), config.core.compression_level);
        let refs = FileRefStore::new(&dir);
        let working_copy = FsWorkingCopy::new(&root);
        debug!(root = %root.display(), "opened repository");

        Ok(Self {
            root,
            dir,
            config,
            store,
            refs,
            working_copy,
        })
    }

    /// Open the repository containing `start`, searching parent directories.
    pub fn discover(start: impl AsRef<Path>) -> SdkResult<Self> {
        let start = start.as_ref();
        let start_abs = fs::canonicalize(start)?;
        start_abs
            .ancestors()
            .find(|dir| dir.join(REPO_DIR).join(HEAD_FILE).is_file())
            .map(Self::open)
            .unwrap_or_else(|| Err(SdkError::NotInitialized(start.to_path_buf())))
    }

    // ---- Accessors ----

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> &LooseObjectStore {
        &self.store
    }

    pub fn refs(&self) -> &FileRefStore {
        &self.refs
    }

    pub fn working_copy(&self) -> &FsWorkingCopy {
        &self.working_copy
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Load the staging index; a repository without one has an empty index.
    pub fn load_index(&self) -> SdkResult<StagingIndex> {
        Ok(StagingIndex::load(self.index_path())?)
    }

    // ---- Staging ----

    /// Store the given files (directories are walked) and stage them.
    ///
    /// Paths are relative to the repository root or absolute within it.
    /// Directory walks skip the `.delta` directory and anything matched by a
    /// `.deltaignore` file. Returns the staged repository-relative paths.
    pub fn add<P: AsRef<Path>>(&self, paths: &[P]) -> SdkResult<Vec<String>> {
        let mut staged = BTreeMap::new();
        for path in paths {
            let abs = self.resolve(path.as_ref())?;
            if !abs.exists() {
                return Err(SdkError::PathNotFound(path.as_ref().to_path_buf()));
            }
            if abs.starts_with(&self.dir) {
                debug!(path = %abs.display(), "skipping repository directory");
                continue;
            }
            if abs.is_dir() {
                for file in self.walk(&abs)? {
                    self.stage_file(&file, &mut staged)?;
                }
            } else {
                self.stage_file(&abs, &mut staged)?;
            }
        }

        let mut index = self.load_index()?;
        index.add(&staged, &self.working_copy)?;
        Ok(staged.into_keys().collect())
    }

    fn stage_file(&self, abs: &Path, staged: &mut BTreeMap<String, ObjectId>) -> SdkResult<()> {
        let rel = self.relative(abs)?;
        let data = self.working_copy.read(&rel)?;
        let id = self.store.store(ObjectKind::Blob, data)?;
        debug!(path = %rel, %id, "stored blob");
        staged.insert(rel, id);
        Ok(())
    }

    fn walk(&self, dir: &Path) -> SdkResult<Vec<PathBuf>> {
        let repo_dir = self.dir.clone();
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .hidden(false)
            .parents(true)
            .add_custom_ignore_filename(IGNORE_FILE)
            .filter_entry(move |entry| entry.path() != repo_dir)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Absolute location of a user-supplied path.
    fn resolve(&self, path: &Path) -> SdkResult<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let abs = match fs::canonicalize(&joined) {
            Ok(abs) => abs,
            Err(_) => normalize(&joined),
        };
        if !abs.starts_with(&self.root) {
            return Err(SdkError::OutsideRepository(path.to_path_buf()));
        }
        Ok(abs)
    }

    /// Repository-relative, `/`-separated form of an absolute path.
    fn relative(&self, abs: &Path) -> SdkResult<String> {
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| SdkError::OutsideRepository(abs.to_path_buf()))?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Repository-relative form of a user-supplied path.
    pub fn relative_path(&self, path: impl AsRef<Path>) -> SdkResult<String> {
        let abs = self.resolve(path.as_ref())?;
        self.relative(&abs)
    }

    /// Tracked paths in sorted order.
    pub fn tracked(&self) -> SdkResult<Vec<String>> {
        let index = self.load_index()?;
        Ok(index.paths().map(str::to_string).collect())
    }

    // ---- Snapshots ----

    /// Snapshot the index as a commit on the current branch.
    pub fn commit(&self, message: &str) -> SdkResult<ObjectId> {
        let index = self.load_index()?;
        if index.is_empty() {
            return Err(SdkError::NothingToCommit);
        }

        let tracked = index.fetch_index_data(&self.working_copy);
        let builder = TreeBuilder::from_entries(
            tracked
                .iter()
                .map(|(path, file)| (path.as_str(), file.object_id, file.mode)),
        );
        let tree = builder.generate(&self.store)?;

        let parent = self.refs.head_commit()?;
        let (name, email) = self.config.author();
        let commit = Commit::new(tree, parent, Signature::now(name, email), message);
        let id = self.store.write(&commit.to_stored_object())?;
        self.refs.update_ref(&id)?;

        info!(%id, %tree, parent = ?parent, files = tracked.len(), "created commit");
        Ok(id)
    }

    /// Walk history from HEAD through parent links, newest first.
    pub fn log(&self, limit: Option<usize>) -> SdkResult<Vec<LogEntry>> {
        let mut entries = Vec::new();
        let mut next = self.refs.head_commit()?;
        while let Some(id) = next {
            if limit.is_some_and(|limit| entries.len() >= limit) {
                break;
            }
            let commit = self.read_commit(&id)?;
            next = commit.parent;
            entries.push(LogEntry { id, commit });
        }
        Ok(entries)
    }

    // ---- Branches ----

    /// Create a branch at the current head commit.
    pub fn create_branch(&self, name: &str) -> SdkResult<()> {
        self.refs.create_branch(name)?;
        Ok(())
    }

    /// Point HEAD at an existing branch. The working copy is left as is.
    pub fn checkout(&self, name: &str) -> SdkResult<()> {
        validate_branch_name(name)?;
        match self.refs.update_head(&branch_ref(name)) {
            Ok(()) => Ok(()),
            Err(RefError::NotFound { .. }) => Err(SdkError::BranchNotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn branches(&self) -> SdkResult<Vec<String>> {
        Ok(self.refs.branches()?)
    }

    pub fn current_branch(&self) -> SdkResult<Option<String>> {
        Ok(self.refs.current_branch()?)
    }

    pub fn head_commit(&self) -> SdkResult<Option<ObjectId>> {
        Ok(self.refs.head_commit()?)
    }

    // ---- Diff ----

    /// Diff the working-copy version of a tracked file against its staged
    /// version.
    pub fn diff(&self, path: impl AsRef<Path>) -> SdkResult<LineDiff> {
        let rel = self.relative_path(path)?;
        let index = self.load_index()?;
        let id = index.object_id(&rel).map_err(|e| match e {
            IndexError::PathNotFound(p) => SdkError::NotTracked(p),
            other => other.into(),
        })?;

        let staged = self.read_blob(&id)?;
        let current = self.working_copy.read(&rel)?;
        Ok(diff_blobs(&current, &staged))
    }

    // ---- Object access ----

    pub fn read_blob(&self, id: &ObjectId) -> SdkResult<Vec<u8>> {
        let obj = self.store.read_existing(id)?;
        Ok(Blob::from_stored_object(&obj)?.data)
    }

    pub fn read_tree(&self, id: &ObjectId) -> SdkResult<Tree> {
        let obj = self.store.read_existing(id)?;
        Ok(Tree::from_stored_object(&obj)?)
    }

    pub fn read_commit(&self, id: &ObjectId) -> SdkResult<Commit> {
        let obj = self.store.read_existing(id)?;
        Ok(Commit::from_stored_object(&obj)?)
    }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
