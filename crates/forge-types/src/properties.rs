use serde::{Deserialize, Serialize};

/// Market metadata attached to tradeable items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub category: u16,
    pub trade_as: u16,
    pub show_as: u16,
    pub name: String,
    pub restrict_profession: u16,
    pub restrict_level: u16,
}

/// A typed metadata attribute of a Thing.
///
/// Each variant corresponds to one flag of the metadata file. Which numeric
/// flag code a variant uses depends on the client version; see the codec's
/// flag tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThingProperty {
    Ground { speed: u16 },
    GroundBorder,
    OnBottom,
    OnTop,
    Container,
    Stackable,
    ForceUse,
    MultiUse,
    HasCharges,
    Writable { max_length: u16 },
    WritableOnce { max_length: u16 },
    FluidContainer,
    Fluid,
    Unpassable,
    Unmoveable,
    BlockMissile,
    BlockPathfind,
    NoMoveAnimation,
    Pickupable,
    Hangable,
    Vertical,
    Horizontal,
    Rotatable,
    Light { level: u16, color: u16 },
    DontHide,
    Translucent,
    FloorChange,
    Offset { x: i16, y: i16 },
    Elevation { height: u16 },
    LyingObject,
    AnimateAlways,
    MiniMap { color: u16 },
    LensHelp { kind: u16 },
    FullGround,
    IgnoreLook,
    Cloth { slot: u16 },
    Market(MarketInfo),
    DefaultAction { action: u16 },
    Wrappable,
    Unwrappable,
    TopEffect,
    Usable,
}

/// Field-less discriminant of [`ThingProperty`], used as a map key and in filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyKind {
    Ground,
    GroundBorder,
    OnBottom,
    OnTop,
    Container,
    Stackable,
    ForceUse,
    MultiUse,
    HasCharges,
    Writable,
    WritableOnce,
    FluidContainer,
    Fluid,
    Unpassable,
    Unmoveable,
    BlockMissile,
    BlockPathfind,
    NoMoveAnimation,
    Pickupable,
    Hangable,
    Vertical,
    Horizontal,
    Rotatable,
    Light,
    DontHide,
    Translucent,
    FloorChange,
    Offset,
    Elevation,
    LyingObject,
    AnimateAlways,
    MiniMap,
    LensHelp,
    FullGround,
    IgnoreLook,
    Cloth,
    Market,
    DefaultAction,
    Wrappable,
    Unwrappable,
    TopEffect,
    Usable,
}

impl ThingProperty {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Ground { .. } => PropertyKind::Ground,
            Self::GroundBorder => PropertyKind::GroundBorder,
            Self::OnBottom => PropertyKind::OnBottom,
            Self::OnTop => PropertyKind::OnTop,
            Self::Container => PropertyKind::Container,
            Self::Stackable => PropertyKind::Stackable,
            Self::ForceUse => PropertyKind::ForceUse,
            Self::MultiUse => PropertyKind::MultiUse,
            Self::HasCharges => PropertyKind::HasCharges,
            Self::Writable { .. } => PropertyKind::Writable,
            Self::WritableOnce { .. } => PropertyKind::WritableOnce,
            Self::FluidContainer => PropertyKind::FluidContainer,
            Self::Fluid => PropertyKind::Fluid,
            Self::Unpassable => PropertyKind::Unpassable,
            Self::Unmoveable => PropertyKind::Unmoveable,
            Self::BlockMissile => PropertyKind::BlockMissile,
            Self::BlockPathfind => PropertyKind::BlockPathfind,
            Self::NoMoveAnimation => PropertyKind::NoMoveAnimation,
            Self::Pickupable => PropertyKind::Pickupable,
            Self::Hangable => PropertyKind::Hangable,
            Self::Vertical => PropertyKind::Vertical,
            Self::Horizontal => PropertyKind::Horizontal,
            Self::Rotatable => PropertyKind::Rotatable,
            Self::Light { .. } => PropertyKind::Light,
            Self::DontHide => PropertyKind::DontHide,
            Self::Translucent => PropertyKind::Translucent,
            Self::FloorChange => PropertyKind::FloorChange,
            Self::Offset { .. } => PropertyKind::Offset,
            Self::Elevation { .. } => PropertyKind::Elevation,
            Self::LyingObject => PropertyKind::LyingObject,
            Self::AnimateAlways => PropertyKind::AnimateAlways,
            Self::MiniMap { .. } => PropertyKind::MiniMap,
            Self::LensHelp { .. } => PropertyKind::LensHelp,
            Self::FullGround => PropertyKind::FullGround,
            Self::IgnoreLook => PropertyKind::IgnoreLook,
            Self::Cloth { .. } => PropertyKind::Cloth,
            Self::Market(_) => PropertyKind::Market,
            Self::DefaultAction { .. } => PropertyKind::DefaultAction,
            Self::Wrappable => PropertyKind::Wrappable,
            Self::Unwrappable => PropertyKind::Unwrappable,
            Self::TopEffect => PropertyKind::TopEffect,
            Self::Usable => PropertyKind::Usable,
        }
    }
}

impl PropertyKind {
    /// The property value for kinds that carry no payload.
    pub fn unit_property(self) -> Option<ThingProperty> {
        let prop = match self {
            Self::GroundBorder => ThingProperty::GroundBorder,
            Self::OnBottom => ThingProperty::OnBottom,
            Self::OnTop => ThingProperty::OnTop,
            Self::Container => ThingProperty::Container,
            Self::Stackable => ThingProperty::Stackable,
            Self::ForceUse => ThingProperty::ForceUse,
            Self::MultiUse => ThingProperty::MultiUse,
            Self::HasCharges => ThingProperty::HasCharges,
            Self::FluidContainer => ThingProperty::FluidContainer,
            Self::Fluid => ThingProperty::Fluid,
            Self::Unpassable => ThingProperty::Unpassable,
            Self::Unmoveable => ThingProperty::Unmoveable,
            Self::BlockMissile => ThingProperty::BlockMissile,
            Self::BlockPathfind => ThingProperty::BlockPathfind,
            Self::NoMoveAnimation => ThingProperty::NoMoveAnimation,
            Self::Pickupable => ThingProperty::Pickupable,
            Self::Hangable => ThingProperty::Hangable,
            Self::Vertical => ThingProperty::Vertical,
            Self::Horizontal => ThingProperty::Horizontal,
            Self::Rotatable => ThingProperty::Rotatable,
            Self::DontHide => ThingProperty::DontHide,
            Self::Translucent => ThingProperty::Translucent,
            Self::FloorChange => ThingProperty::FloorChange,
            Self::LyingObject => ThingProperty::LyingObject,
            Self::AnimateAlways => ThingProperty::AnimateAlways,
            Self::FullGround => ThingProperty::FullGround,
            Self::IgnoreLook => ThingProperty::IgnoreLook,
            Self::Wrappable => ThingProperty::Wrappable,
            Self::Unwrappable => ThingProperty::Unwrappable,
            Self::TopEffect => ThingProperty::TopEffect,
            Self::Usable => ThingProperty::Usable,
            _ => return None,
        };
        Some(prop)
    }
}

/// A predicate over a Thing's properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyFilter {
    /// The property is present, whatever its value.
    Has(PropertyKind),
    /// The property is absent.
    Lacks(PropertyKind),
    /// The property is present with exactly this value.
    Equals(ThingProperty),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_valued_property() {
        assert_eq!(ThingProperty::Ground { speed: 150 }.kind(), PropertyKind::Ground);
        assert_eq!(
            ThingProperty::Market(MarketInfo::default()).kind(),
            PropertyKind::Market
        );
    }

    #[test]
    fn unit_property_roundtrips_kind() {
        let unit = PropertyKind::Stackable.unit_property().unwrap();
        assert_eq!(unit.kind(), PropertyKind::Stackable);
        assert!(PropertyKind::Light.unit_property().is_none());
    }
}
