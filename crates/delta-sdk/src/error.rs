use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("not a delta repository: {0}")]
    NotInitialized(PathBuf),

    #[error("repository already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("path is outside the repository: {0}")]
    OutsideRepository(PathBuf),

    #[error("path is not tracked: {0}")]
    NotTracked(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("nothing to commit: the index is empty")]
    NothingToCommit,

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] delta_store::StoreError),

    #[error("index error: {0}")]
    Index(#[from] delta_index::IndexError),

    #[error("ref error: {0}")]
    Ref(#[from] delta_refs::RefError),

    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
