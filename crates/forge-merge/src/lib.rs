//! Merge engine for Object Forge.
//!
//! Appends every thing and sprite of a source pair to a destination pair.
//! Source sprites keep their order and land after the destination's last
//! sprite, so every source reference shifts by the destination's sprite
//! count. The merge never deduplicates or overwrites; run the sprite
//! optimizer afterwards for that.

pub mod error;
pub mod merger;

pub use error::{MergeError, MergeResult};
pub use merger::{MergeReport, Merger};
