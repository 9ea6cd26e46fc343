use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric id of a sprite in a sprite file. Id 0 is the reserved blank sprite.
pub type SpriteId = u32;

/// One entry of a frame group's sprite table.
///
/// Inside a live store every entry is `Resolved`. `Pending` only appears in
/// edit buffers and decoded exchange containers, marking a slot whose pixels
/// still need a destination id. Pending entries are never persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteRef {
    Resolved(SpriteId),
    Pending,
}

impl SpriteRef {
    /// The blank sprite.
    pub const BLANK: Self = Self::Resolved(0);

    /// The resolved id, if any.
    pub fn id(self) -> Option<SpriteId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Pending => None,
        }
    }

    pub fn is_blank(self) -> bool {
        self == Self::BLANK
    }

    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }

    /// Resolved non-blank id, the kind of entry that points into a sprite store.
    pub fn sprite_id(self) -> Option<SpriteId> {
        match self {
            Self::Resolved(0) | Self::Pending => None,
            Self::Resolved(id) => Some(id),
        }
    }
}

impl Default for SpriteRef {
    fn default() -> Self {
        Self::BLANK
    }
}

impl From<SpriteId> for SpriteRef {
    fn from(id: SpriteId) -> Self {
        Self::Resolved(id)
    }
}

impl fmt::Debug for SpriteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(id) => write!(f, "#{id}"),
            Self::Pending => f.write_str("#pending"),
        }
    }
}
