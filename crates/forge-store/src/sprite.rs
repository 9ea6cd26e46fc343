use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use forge_crypto::{ContentHash, ContentHasher};
use forge_types::{pixels, SPRITE_DATA_SIZE, SPRITE_SIZE};

/// One 32x32 RGBA sprite with a lazily computed content hash.
///
/// Pixel buffers are immutable and shared between clones.
#[derive(Clone)]
pub struct Sprite {
    pixels: Arc<[u8]>,
    hash: OnceCell<ContentHash>,
}

impl Sprite {
    /// Wrap a pixel buffer. The caller guarantees it holds
    /// [`SPRITE_DATA_SIZE`] bytes.
    pub(crate) fn from_pixels(pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), SPRITE_DATA_SIZE);
        Self {
            pixels: pixels.into(),
            hash: OnceCell::new(),
        }
    }

    pub fn blank() -> Self {
        Self::from_pixels(pixels::blank_pixels())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn to_pixels(&self) -> Vec<u8> {
        self.pixels.to_vec()
    }

    /// Content hash, computed on first use.
    pub fn hash(&self) -> ContentHash {
        *self.hash.get_or_init(|| ContentHasher::sprite(&self.pixels))
    }

    pub fn is_blank(&self) -> bool {
        pixels::is_blank(&self.pixels)
    }
}

impl PartialEq for Sprite {
    fn eq(&self, other: &Self) -> bool {
        self.pixels == other.pixels
    }
}

impl Eq for Sprite {}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("hash", &self.hash())
            .field("blank", &self.is_blank())
            .finish()
    }
}

/// Pixels of the alert sprite shown for dangling references: an opaque red
/// frame with a diagonal cross.
pub fn alert_pixels() -> Vec<u8> {
    let mut px = pixels::blank_pixels();
    for y in 0..SPRITE_SIZE {
        for x in 0..SPRITE_SIZE {
            let edge = x == 0 || y == 0 || x == SPRITE_SIZE - 1 || y == SPRITE_SIZE - 1;
            let cross = x == y || x + y == SPRITE_SIZE - 1;
            if edge || cross {
                let i = (y * SPRITE_SIZE + x) * 4;
                px[i..i + 4].copy_from_slice(&[0xFF, 0x00, 0x00, 0xFF]);
            }
        }
    }
    px
}
