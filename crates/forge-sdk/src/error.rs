use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no asset pair is loaded")]
    NotLoaded,

    #[error("no known client version has signatures dat={dat:#x} spr={spr:#x}")]
    UnknownSignatures { dat: u32, spr: u32 },

    #[error("invalid sidecar {path}: {reason}")]
    Sidecar { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("type error: {0}")]
    Type(#[from] forge_types::TypeError),

    #[error("codec error: {0}")]
    Codec(#[from] forge_codec::CodecError),

    #[error("store error: {0}")]
    Store(#[from] forge_store::StoreError),

    #[error("exchange error: {0}")]
    Obd(#[from] forge_obd::ObdError),

    #[error("merge error: {0}")]
    Merge(#[from] forge_merge::MergeError),

    #[error("optimize error: {0}")]
    Optimize(#[from] forge_optimize::OptimizeError),

    #[error("convert error: {0}")]
    Convert(#[from] forge_convert::ConvertError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
