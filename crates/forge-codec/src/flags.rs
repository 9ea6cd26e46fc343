//! Flag code tables for every supported metadata layout.
//!
//! The same property has different numeric codes across client generations.
//! Each [`FlagSet`] maps codes to [`PropertyKind`]s in ascending code order;
//! encoding walks the table in that order.

use forge_types::PropertyKind;

/// Terminator of a thing's flag stream.
pub const LAST_FLAG: u8 = 0xFF;

use PropertyKind as K;

const V1_FLAGS: &[(u8, PropertyKind)] = &[
    (0x00, K::Ground),
    (0x01, K::OnBottom),
    (0x02, K::OnTop),
    (0x03, K::Container),
    (0x04, K::Stackable),
    (0x05, K::MultiUse),
    (0x06, K::ForceUse),
    (0x07, K::Writable),
    (0x08, K::WritableOnce),
    (0x09, K::FluidContainer),
    (0x0A, K::Fluid),
    (0x0B, K::Unpassable),
    (0x0C, K::Unmoveable),
    (0x0D, K::BlockMissile),
    (0x0E, K::BlockPathfind),
    (0x0F, K::Pickupable),
    (0x10, K::Light),
    (0x11, K::FloorChange),
    (0x12, K::FullGround),
    (0x13, K::Elevation),
    (0x14, K::Offset),
    (0x16, K::MiniMap),
    (0x17, K::Rotatable),
    (0x18, K::LyingObject),
    (0x19, K::Hangable),
    (0x1A, K::Vertical),
    (0x1B, K::Horizontal),
    (0x1C, K::AnimateAlways),
    (0x1D, K::LensHelp),
];

const V3_FLAGS: &[(u8, PropertyKind)] = &[
    (0x00, K::Ground),
    (0x01, K::GroundBorder),
    (0x02, K::OnBottom),
    (0x03, K::OnTop),
    (0x04, K::Container),
    (0x05, K::Stackable),
    (0x06, K::MultiUse),
    (0x07, K::ForceUse),
    (0x08, K::Writable),
    (0x09, K::WritableOnce),
    (0x0A, K::FluidContainer),
    (0x0B, K::Fluid),
    (0x0C, K::Unpassable),
    (0x0D, K::Unmoveable),
    (0x0E, K::BlockMissile),
    (0x0F, K::BlockPathfind),
    (0x10, K::Pickupable),
    (0x11, K::Hangable),
    (0x12, K::Vertical),
    (0x13, K::Horizontal),
    (0x14, K::Rotatable),
    (0x15, K::Light),
    (0x16, K::DontHide),
    (0x17, K::FloorChange),
    (0x18, K::Offset),
    (0x19, K::Elevation),
    (0x1A, K::LyingObject),
    (0x1B, K::AnimateAlways),
    (0x1C, K::MiniMap),
    (0x1D, K::LensHelp),
    (0x1E, K::FullGround),
];

const V4_FLAGS: &[(u8, PropertyKind)] = &[
    (0x00, K::Ground),
    (0x01, K::GroundBorder),
    (0x02, K::OnBottom),
    (0x03, K::OnTop),
    (0x04, K::Container),
    (0x05, K::Stackable),
    (0x06, K::ForceUse),
    (0x07, K::MultiUse),
    (0x08, K::HasCharges),
    (0x09, K::Writable),
    (0x0A, K::WritableOnce),
    (0x0B, K::FluidContainer),
    (0x0C, K::Fluid),
    (0x0D, K::Unpassable),
    (0x0E, K::Unmoveable),
    (0x0F, K::BlockMissile),
    (0x10, K::BlockPathfind),
    (0x11, K::Pickupable),
    (0x12, K::Hangable),
    (0x13, K::Vertical),
    (0x14, K::Horizontal),
    (0x15, K::Rotatable),
    (0x16, K::Light),
    (0x17, K::DontHide),
    (0x18, K::FloorChange),
    (0x19, K::Offset),
    (0x1A, K::Elevation),
    (0x1B, K::LyingObject),
    (0x1C, K::AnimateAlways),
    (0x1D, K::MiniMap),
    (0x1E, K::LensHelp),
    (0x1F, K::FullGround),
    (0x20, K::IgnoreLook),
];

const V5_FLAGS: &[(u8, PropertyKind)] = &[
    (0x00, K::Ground),
    (0x01, K::GroundBorder),
    (0x02, K::OnBottom),
    (0x03, K::OnTop),
    (0x04, K::Container),
    (0x05, K::Stackable),
    (0x06, K::ForceUse),
    (0x07, K::MultiUse),
    (0x08, K::Writable),
    (0x09, K::WritableOnce),
    (0x0A, K::FluidContainer),
    (0x0B, K::Fluid),
    (0x0C, K::Unpassable),
    (0x0D, K::Unmoveable),
    (0x0E, K::BlockMissile),
    (0x0F, K::BlockPathfind),
    (0x10, K::Pickupable),
    (0x11, K::Hangable),
    (0x12, K::Vertical),
    (0x13, K::Horizontal),
    (0x14, K::Rotatable),
    (0x15, K::Light),
    (0x16, K::DontHide),
    (0x17, K::Translucent),
    (0x18, K::Offset),
    (0x19, K::Elevation),
    (0x1A, K::LyingObject),
    (0x1B, K::AnimateAlways),
    (0x1C, K::MiniMap),
    (0x1D, K::LensHelp),
    (0x1E, K::FullGround),
    (0x1F, K::IgnoreLook),
    (0x20, K::Cloth),
    (0x21, K::Market),
];

const V6_FLAGS: &[(u8, PropertyKind)] = &[
    (0x00, K::Ground),
    (0x01, K::GroundBorder),
    (0x02, K::OnBottom),
    (0x03, K::OnTop),
    (0x04, K::Container),
    (0x05, K::Stackable),
    (0x06, K::ForceUse),
    (0x07, K::MultiUse),
    (0x08, K::Writable),
    (0x09, K::WritableOnce),
    (0x0A, K::FluidContainer),
    (0x0B, K::Fluid),
    (0x0C, K::Unpassable),
    (0x0D, K::Unmoveable),
    (0x0E, K::BlockMissile),
    (0x0F, K::BlockPathfind),
    (0x10, K::NoMoveAnimation),
    (0x11, K::Pickupable),
    (0x12, K::Hangable),
    (0x13, K::Vertical),
    (0x14, K::Horizontal),
    (0x15, K::Rotatable),
    (0x16, K::Light),
    (0x17, K::DontHide),
    (0x18, K::Translucent),
    (0x19, K::Offset),
    (0x1A, K::Elevation),
    (0x1B, K::LyingObject),
    (0x1C, K::AnimateAlways),
    (0x1D, K::MiniMap),
    (0x1E, K::LensHelp),
    (0x1F, K::FullGround),
    (0x20, K::IgnoreLook),
    (0x21, K::Cloth),
    (0x22, K::Market),
    (0x23, K::DefaultAction),
    (0x24, K::Wrappable),
    (0x25, K::Unwrappable),
    (0x26, K::TopEffect),
    (0xFE, K::Usable),
];

/// Metadata flag layout generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlagSet {
    /// Before 7.40. Offset has no payload.
    V1,
    /// 7.40 to 7.54.
    V2,
    /// 7.55 to 7.79.
    V3,
    /// 7.80 to 8.59.
    V4,
    /// 8.60 to 10.09.
    V5,
    /// 10.10 and later.
    V6,
}

/// What a flag code means in a given set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagEntry {
    Property(PropertyKind),
    /// A code this build does not model, skipped by its declared payload width.
    Reserved { width: usize },
}

impl FlagSet {
    pub fn for_version(value: u32) -> Self {
        match value {
            0..=739 => Self::V1,
            740..=754 => Self::V2,
            755..=779 => Self::V3,
            780..=859 => Self::V4,
            860..=1009 => Self::V5,
            _ => Self::V6,
        }
    }

    /// `(code, kind)` pairs in ascending code order.
    pub fn entries(self) -> &'static [(u8, PropertyKind)] {
        match self {
            Self::V1 | Self::V2 => V1_FLAGS,
            Self::V3 => V3_FLAGS,
            Self::V4 => V4_FLAGS,
            Self::V5 => V5_FLAGS,
            Self::V6 => V6_FLAGS,
        }
    }

    pub fn kind(self, code: u8) -> Option<PropertyKind> {
        self.entries()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, k)| *k)
    }

    pub fn code(self, kind: PropertyKind) -> Option<u8> {
        self.entries()
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(c, _)| *c)
    }

    /// Offset carries an explicit `(x, y)` payload.
    pub fn offset_has_payload(self) -> bool {
        self != Self::V1
    }
}
