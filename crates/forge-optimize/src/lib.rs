//! Store-wide optimization passes for Object Forge.
//!
//! - [`SpriteOptimizer`] hashes every sprite, redirects duplicates to their
//!   lowest id, drops unreferenced sprites, and renumbers the survivors
//!   densely, rewriting every thing reference in the same step.
//! - [`DurationOptimizer`] bounds or flattens per-phase animation durations.
//!
//! Both passes run synchronously and report progress per chunk.

pub mod durations;
pub mod error;
pub mod sprites;

pub use durations::{DurationBounds, DurationMode, DurationOptimizer, DurationReport, DurationSettings};
pub use error::{OptimizeError, OptimizeResult};
pub use sprites::{SpriteOptimizer, SpriteOptions, SpriteReport};
