use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("unknown thing category: {0}")]
    UnknownCategory(String),

    #[error("unknown frame group type: {0}")]
    UnknownFrameGroup(u8),

    #[error("unknown client version: {0}")]
    UnknownVersion(u32),

    #[error("invalid version table: {0}")]
    InvalidVersionTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
