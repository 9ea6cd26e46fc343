//! Versioned binary codecs for Object Forge.
//!
//! Both files of a client asset pair are driven by a per-version
//! [`FieldTable`]: which flag codes map to which properties, whether sprite
//! ids are 16 or 32 bits wide, whether pattern Z, frame durations, and frame
//! groups are present, and whether sprite pixels carry alpha.
//!
//! # Architecture
//!
//! - **Metadata file**: signature, four 16-bit category max ids, then one
//!   self-terminating flag stream plus frame groups per thing, ascending ids
//! - **Sprite file**: signature, sprite count, offset table, then one
//!   run-length packed pixel record per non-blank sprite
//! - [`ByteReader`] / [`ByteWriter`]: little-endian primitives with
//!   truncation detection shared by both codecs

pub mod error;
pub mod fields;
pub mod flags;
pub mod metadata;
pub mod reader;
pub mod sprite;
pub mod thing;
pub mod writer;

pub use error::{CodecError, CodecResult};
pub use fields::{FieldTable, IdWidth};
pub use flags::{FlagEntry, FlagSet, LAST_FLAG};
pub use metadata::{decode_metadata, encode_metadata, read_signature, MetadataFile};
pub use reader::ByteReader;
pub use sprite::{
    decode_pixels, decode_sprite_file, encode_pixels, encode_sprite_file, encode_sprites,
    normalize_pixels, SpriteFile, COLOR_KEY,
};
pub use thing::{read_thing, write_thing};
pub use writer::ByteWriter;
