use forge_codec::CodecError;
use forge_types::TypeError;

/// Errors from encoding or decoding an exchange container.
#[derive(Debug, thiserror::Error)]
pub enum ObdError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// zstd failure or a read from the decompressed body.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("container is malformed: {0}")]
    Malformed(String),

    /// The object cannot be expressed in the requested container version.
    #[error("not representable in {version}: {reason}")]
    Unsupported { version: String, reason: String },
}

/// Result alias for container operations.
pub type ObdResult<T> = Result<T, ObdError>;
