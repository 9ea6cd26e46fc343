use forge_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid duration bounds: {0}")]
    InvalidBounds(String),
}

pub type OptimizeResult<T> = Result<T, OptimizeError>;
