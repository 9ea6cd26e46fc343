use std::fmt;

use forge_types::SPRITE_DATA_SIZE;
use serde::{Deserialize, Serialize};

/// A 32-byte BLAKE3 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every computation so digests from
/// different domains never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for decoded RGBA sprite buffers.
    pub const SPRITE: Self = Self {
        domain: "forge-sprite-v1",
    };

    pub fn hash(&self, data: &[u8]) -> ContentHash {
        self.digest(data, None)
    }

    fn digest(&self, data: &[u8], len_prefix: Option<u64>) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        if let Some(len) = len_prefix {
            hasher.update(&len.to_le_bytes());
        }
        hasher.update(data);
        ContentHash(*hasher.finalize().as_bytes())
    }

    /// Digest of a sprite buffer. Buffers of the wrong size never collide
    /// with well-formed ones because the length is part of the input.
    pub fn sprite(pixels: &[u8]) -> ContentHash {
        let prefix = (pixels.len() != SPRITE_DATA_SIZE).then_some(pixels.len() as u64);
        Self::SPRITE.digest(pixels, prefix)
    }
}
