use forge_types::{ThingCategory, ThingId, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated data at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("signature mismatch: expected {expected:#010x}, found {actual:#010x}")]
    InvalidSignature { expected: u32, actual: u32 },

    #[error("unknown flag {code:#04x} at offset {offset}")]
    UnknownFlag { code: u8, offset: usize },

    #[error("impossible length at offset {offset}: {reason}")]
    ImpossibleLength { offset: usize, reason: String },

    #[error("sprite run overflows the canvas at offset {offset}")]
    RunOverflow { offset: usize },

    #[error("sprite {0} does not fit in a 16-bit record length")]
    SpriteTooLarge(u32),

    #[error("sprite buffer has {actual} bytes, expected {expected}")]
    BadPixelBuffer { expected: usize, actual: usize },

    #[error("sprite id {id} does not fit in {bits} bits")]
    IdOverflow { id: u32, bits: u32 },

    #[error("{category} {id}: sprite table entry is pending allocation")]
    PendingSprite { category: ThingCategory, id: ThingId },

    #[error("{category} {id}: {reason}")]
    InvalidThing {
        category: ThingCategory,
        id: ThingId,
        reason: String,
    },

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

pub type CodecResult<T> = Result<T, CodecError>;
