//! Frame group conversion for Object Forge.
//!
//! Legacy formats store an outfit as one `Default` group whose first phase
//! is the standing frame and whose remaining phases are the walk cycle.
//! Newer formats split that into separate `Idle` and `Walking` groups. The
//! [`FrameGroupConverter`] rewrites every outfit of a store between the two
//! layouts. Collapsing back to the legacy layout can lose data; every loss
//! is listed in the [`ConversionReport`].

pub mod converter;
pub mod error;

pub use converter::{ConversionReport, ConvertOptions, Direction, FrameGroupConverter, Loss, LossKind};
pub use error::{ConvertError, ConvertResult};
