use forge_store::StoreError;
use forge_types::ThingId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid conversion options: {0}")]
    InvalidOptions(String),

    #[error("outfit {id} cannot be converted: {reason}")]
    Unconvertible { id: ThingId, reason: String },
}

pub type ConvertResult<T> = Result<T, ConvertError>;
