//! Sprite bitmap geometry.

/// Edge length of a sprite tile in pixels.
pub const SPRITE_SIZE: usize = 32;

/// Pixels per sprite tile.
pub const SPRITE_PIXEL_COUNT: usize = SPRITE_SIZE * SPRITE_SIZE;

/// Bytes of one decoded RGBA sprite.
pub const SPRITE_DATA_SIZE: usize = SPRITE_PIXEL_COUNT * 4;

/// A fully transparent sprite buffer.
pub fn blank_pixels() -> Vec<u8> {
    vec![0; SPRITE_DATA_SIZE]
}

/// Returns `true` when every pixel of an RGBA buffer is transparent.
pub fn is_blank(pixels: &[u8]) -> bool {
    pixels.chunks_exact(4).all(|px| px[3] == 0)
}
