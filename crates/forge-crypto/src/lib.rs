//! Content hashing for Object Forge.
//!
//! Sprites are compared by a BLAKE3 digest of their pixel buffer, which lets
//! the sprite store answer "does this id already hold these pixels" and lets
//! the deduplicator find identical sprites in one pass.

pub mod hasher;

pub use hasher::{ContentHash, ContentHasher};
