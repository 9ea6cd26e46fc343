use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric id of a Thing, unique within its category.
pub type ThingId = u32;

/// The four Thing categories, in the order they appear in a metadata file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThingCategory {
    Item,
    Outfit,
    Effect,
    Missile,
}

impl ThingCategory {
    /// All categories in file order.
    pub const ALL: [ThingCategory; 4] = [
        ThingCategory::Item,
        ThingCategory::Outfit,
        ThingCategory::Effect,
        ThingCategory::Missile,
    ];

    /// First id of the category. Item ids below 100 are reserved by the client.
    pub const fn min_id(self) -> ThingId {
        match self {
            Self::Item => 100,
            _ => 1,
        }
    }

    /// Highest id the 16-bit header count can express.
    pub const fn max_id_capacity(self) -> ThingId {
        u16::MAX as ThingId
    }

    /// Position of the category in [`ThingCategory::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::Item => 0,
            Self::Outfit => 1,
            Self::Effect => 2,
            Self::Missile => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Outfit => "outfit",
            Self::Effect => "effect",
            Self::Missile => "missile",
        }
    }

    /// Wire code used by the object exchange container (1-based).
    pub const fn to_byte(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Parse the exchange container's category byte.
    pub fn from_byte(byte: u8) -> Result<Self, TypeError> {
        match byte {
            1 => Ok(Self::Item),
            2 => Ok(Self::Outfit),
            3 => Ok(Self::Effect),
            4 => Ok(Self::Missile),
            other => Err(TypeError::UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for ThingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThingCategory {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "item" => Ok(Self::Item),
            "outfit" => Ok(Self::Outfit),
            "effect" => Ok(Self::Effect),
            "missile" => Ok(Self::Missile),
            _ => Err(TypeError::UnknownCategory(s.to_string())),
        }
    }
}
