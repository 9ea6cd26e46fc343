//! Indexed in-memory stores for Object Forge.
//!
//! A client asset pair is held as two independently addressed stores:
//!
//! - [`ThingStore`] -- thing definitions per category, ids dense from the
//!   category's first id
//! - [`SpriteStore`] -- 32x32 RGBA sprites, ids dense from 1, id 0 the
//!   implicit blank sprite
//!
//! # Design Rules
//!
//! 1. Ids within a category (or within the sprite store) never have holes.
//! 2. Batch mutations validate everything first, then apply; a failed call
//!    leaves the store untouched.
//! 3. Stored values are owned; callers receive clones for editing.
//! 4. Reads of a dangling sprite id fall back to the alert sprite with a
//!    warning instead of failing.
//! 5. Compilation writes to a temporary file and persists it over the
//!    target only after the whole file is encoded.

pub mod canvas;
pub mod error;
pub mod file;
pub mod sprite;
pub mod sprite_store;
pub mod thing_store;

pub use canvas::Canvas;
pub use error::{ErrorClass, StoreError, StoreResult};
pub use sprite::{alert_pixels, Sprite};
pub use sprite_store::{RemovedSprites, ResolvedPixels, SpriteStore, ALERT_SPRITE_ID};
pub use thing_store::ThingStore;
