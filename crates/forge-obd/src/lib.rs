//! Object exchange container (OBD).
//!
//! An OBD carries one thing together with the pixels of every sprite it
//! references, so it can move between unrelated sprite files. Sprite ids
//! inside a container are positional markers only; decoding returns them
//! for reference and marks every non-blank table entry [`SpriteRef::Pending`]
//! so the importer assigns real ids.
//!
//! [`SpriteRef::Pending`]: forge_types::SpriteRef::Pending

pub mod codec;
pub mod error;

pub use codec::{ObdCodec, ObdObject, ObdSprite, ObdVersion};
pub use error::{ObdError, ObdResult};
