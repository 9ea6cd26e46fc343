//! Foundation types for Object Forge.
//!
//! This crate provides the data model shared by every other forge crate:
//! the Thing definitions stored in a client metadata file, their animation
//! frame groups, references into the sprite file, and the explicit version
//! registry that selects a wire-format variant.
//!
//! # Key Types
//!
//! - [`Thing`] -- one object definition (item, outfit, effect, missile)
//! - [`FrameGroup`] -- one animation state of a Thing with its sprite table
//! - [`SpriteRef`] -- a sprite table entry: a resolved id or a pending allocation
//! - [`ThingProperty`] / [`PropertyKind`] -- typed metadata attributes
//! - [`ClientVersion`] / [`VersionTable`] -- known client versions and their signatures
//! - [`FormatFeatures`] -- optional format flags (extended ids, transparency, ...)
//! - [`ProgressEvent`] / [`ProgressSink`] -- progress reporting for long passes

pub mod category;
pub mod error;
pub mod features;
pub mod frame_group;
pub mod pixels;
pub mod progress;
pub mod properties;
pub mod sprite_ref;
pub mod thing;
pub mod version;

pub use category::{ThingCategory, ThingId};
pub use error::TypeError;
pub use features::FormatFeatures;
pub use frame_group::{AnimationMode, FrameAnimation, FrameDuration, FrameGroup, FrameGroupType};
pub use pixels::{SPRITE_DATA_SIZE, SPRITE_PIXEL_COUNT, SPRITE_SIZE};
pub use progress::{NoProgress, ProgressEvent, ProgressFn, ProgressKind, ProgressSink, Reporter};
pub use properties::{MarketInfo, PropertyFilter, PropertyKind, ThingProperty};
pub use sprite_ref::{SpriteId, SpriteRef};
pub use thing::Thing;
pub use version::{ClientVersion, VersionTable};
