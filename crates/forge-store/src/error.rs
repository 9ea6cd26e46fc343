use forge_codec::CodecError;
use forge_types::{SpriteId, ThingCategory, ThingId, TypeError};

/// Coarse failure taxonomy shared by every store operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Corrupt, truncated, or unsupported file contents.
    Format,
    /// Bad argument from the caller.
    Validation,
    /// Id space exhausted.
    Capacity,
    /// A thing points at a sprite that does not exist.
    Reference,
    /// Filesystem failure.
    Io,
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("format error: {0}")]
    Codec(#[from] CodecError),

    #[error("{category} {id} not found")]
    ThingNotFound { category: ThingCategory, id: ThingId },

    #[error("sprite {0} not found")]
    SpriteNotFound(SpriteId),

    /// The caller passed something the store cannot accept.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("capacity exhausted: {0}")]
    Capacity(String),

    /// Removing sprites would leave things pointing at them.
    #[error("sprite {sprite} is still referenced by {category} {thing}")]
    StillReferenced {
        sprite: SpriteId,
        category: ThingCategory,
        thing: ThingId,
    },

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Codec(_) => ErrorClass::Format,
            Self::ThingNotFound { .. }
            | Self::SpriteNotFound(_)
            | Self::Validation(_)
            | Self::Type(_) => ErrorClass::Validation,
            Self::Capacity(_) => ErrorClass::Capacity,
            Self::StillReferenced { .. } => ErrorClass::Reference,
            Self::Io(_) => ErrorClass::Io,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
