use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{ThingCategory, ThingId};
use crate::frame_group::{FrameGroup, FrameGroupType};
use crate::properties::{PropertyFilter, PropertyKind, ThingProperty};
use crate::sprite_ref::{SpriteId, SpriteRef};

/// A game object definition: category, id, properties, and frame groups.
///
/// `Clone` is a deep copy: frame groups and their sprite tables are owned,
/// so an edited copy never aliases the definition held by a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    pub id: ThingId,
    pub category: ThingCategory,
    pub properties: BTreeMap<PropertyKind, ThingProperty>,
    pub groups: BTreeMap<FrameGroupType, FrameGroup>,
}

impl Thing {
    /// A Thing with no properties and a single blank `Default` group.
    pub fn new(id: ThingId, category: ThingCategory) -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(FrameGroupType::Default, FrameGroup::new(FrameGroupType::Default));
        Self {
            id,
            category,
            properties: BTreeMap::new(),
            groups,
        }
    }

    /// The blank Thing seeded at the first id of a category.
    pub fn placeholder(category: ThingCategory) -> Self {
        Self::new(category.min_id(), category)
    }

    pub fn with_id(mut self, id: ThingId) -> Self {
        self.id = id;
        self
    }

    pub fn with_property(mut self, property: ThingProperty) -> Self {
        self.set_property(property);
        self
    }

    /// Insert or overwrite a property.
    pub fn set_property(&mut self, property: ThingProperty) {
        self.properties.insert(property.kind(), property);
    }

    pub fn property(&self, kind: PropertyKind) -> Option<&ThingProperty> {
        self.properties.get(&kind)
    }

    pub fn has_property(&self, kind: PropertyKind) -> bool {
        self.properties.contains_key(&kind)
    }

    pub fn remove_property(&mut self, kind: PropertyKind) -> Option<ThingProperty> {
        self.properties.remove(&kind)
    }

    /// Returns `true` if every filter holds.
    pub fn matches(&self, filters: &[PropertyFilter]) -> bool {
        filters.iter().all(|filter| match filter {
            PropertyFilter::Has(kind) => self.has_property(*kind),
            PropertyFilter::Lacks(kind) => !self.has_property(*kind),
            PropertyFilter::Equals(prop) => self.property(prop.kind()) == Some(prop),
        })
    }

    pub fn group(&self, kind: FrameGroupType) -> Option<&FrameGroup> {
        self.groups.get(&kind)
    }

    pub fn group_mut(&mut self, kind: FrameGroupType) -> Option<&mut FrameGroup> {
        self.groups.get_mut(&kind)
    }

    /// The group shown when no animation state applies: `Default`, else `Idle`.
    pub fn primary_group(&self) -> Option<&FrameGroup> {
        self.group(FrameGroupType::Default)
            .or_else(|| self.group(FrameGroupType::Idle))
    }

    /// Returns `true` if the Thing is laid out as Idle/Walking groups.
    pub fn has_frame_groups(&self) -> bool {
        self.groups.contains_key(&FrameGroupType::Idle)
            || self.groups.contains_key(&FrameGroupType::Walking)
    }

    pub fn sprite_refs(&self) -> impl Iterator<Item = &SpriteRef> {
        self.groups.values().flat_map(|g| g.sprites.iter())
    }

    pub fn sprite_refs_mut(&mut self) -> impl Iterator<Item = &mut SpriteRef> {
        self.groups.values_mut().flat_map(|g| g.sprites.iter_mut())
    }

    /// Resolved non-blank sprite ids, in table order (duplicates kept).
    pub fn sprite_ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.sprite_refs().filter_map(|r| r.sprite_id())
    }

    /// Returns `true` if any entry is still awaiting allocation.
    pub fn has_pending_sprites(&self) -> bool {
        self.sprite_refs().any(|r| r.is_pending())
    }

    /// All groups are internally consistent and at least one exists.
    pub fn is_consistent(&self) -> bool {
        !self.groups.is_empty() && self.groups.values().all(FrameGroup::is_consistent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_thing_has_default_group() {
        let thing = Thing::new(100, ThingCategory::Item);
        assert!(thing.is_consistent());
        assert!(!thing.has_frame_groups());
        assert_eq!(thing.primary_group().unwrap().kind, FrameGroupType::Default);
    }

    #[test]
    fn clone_does_not_alias_sprite_tables() {
        let mut stored = Thing::new(100, ThingCategory::Item);
        stored.group_mut(FrameGroupType::Default).unwrap().sprites[0] = SpriteRef::Resolved(5);
        let mut edit = stored.clone();
        edit.group_mut(FrameGroupType::Default).unwrap().sprites[0] = SpriteRef::Resolved(9);
        assert_eq!(stored.sprite_ids().collect::<Vec<_>>(), vec![5]);
        assert_eq!(edit.sprite_ids().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let thing = Thing::new(100, ThingCategory::Item)
            .with_property(ThingProperty::Ground { speed: 150 })
            .with_property(ThingProperty::FullGround);

        assert!(thing.matches(&[]));
        assert!(thing.matches(&[
            PropertyFilter::Has(PropertyKind::Ground),
            PropertyFilter::Equals(ThingProperty::FullGround),
        ]));
        assert!(!thing.matches(&[
            PropertyFilter::Has(PropertyKind::Ground),
            PropertyFilter::Has(PropertyKind::Stackable),
        ]));
        assert!(!thing.matches(&[PropertyFilter::Equals(ThingProperty::Ground { speed: 100 })]));
        assert!(thing.matches(&[PropertyFilter::Lacks(PropertyKind::Container)]));
    }

    #[test]
    fn set_property_overwrites_same_kind() {
        let mut thing = Thing::new(1, ThingCategory::Effect);
        thing.set_property(ThingProperty::Light { level: 2, color: 215 });
        thing.set_property(ThingProperty::Light { level: 4, color: 215 });
        assert_eq!(thing.properties.len(), 1);
        assert_eq!(
            thing.property(PropertyKind::Light),
            Some(&ThingProperty::Light { level: 4, color: 215 })
        );
    }
}
