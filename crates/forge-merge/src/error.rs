use forge_store::StoreError;

/// Errors from a merge pass.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("merge exceeds capacity: {0}")]
    Capacity(String),
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
