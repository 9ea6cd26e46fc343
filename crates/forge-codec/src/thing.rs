//! One thing record: flag stream, optional group prefix, frame groups.

use std::collections::BTreeMap;

use forge_types::{
    AnimationMode, FrameAnimation, FrameDuration, FrameGroup, FrameGroupType, MarketInfo,
    PropertyKind, SpriteRef, Thing, ThingCategory, ThingId, ThingProperty, SPRITE_SIZE,
};
use tracing::{debug, warn};

use crate::error::{CodecError, CodecResult};
use crate::fields::{FieldTable, IdWidth};
use crate::flags::{FlagEntry, LAST_FLAG};
use crate::reader::ByteReader;
use crate::writer::ByteWriter;

/// Decode the record of thing `id` at the reader's position.
pub fn read_thing(
    r: &mut ByteReader<'_>,
    id: ThingId,
    category: ThingCategory,
    table: &FieldTable,
) -> CodecResult<Thing> {
    let mut thing = Thing::new(id, category);
    read_flags(r, &mut thing, table)?;

    thing.groups = BTreeMap::new();
    if category == ThingCategory::Outfit && table.has_frame_groups() {
        let offset = r.position();
        let count = r.u8()?;
        if count == 0 {
            return Err(CodecError::ImpossibleLength {
                offset,
                reason: format!("outfit {id} declares no frame groups"),
            });
        }
        for _ in 0..count {
            let type_offset = r.position();
            let byte = r.u8()?;
            let kind = if count == 1 && byte == 0 {
                FrameGroupType::Default
            } else {
                FrameGroupType::from_byte(byte)?
            };
            let group = read_group(r, kind, category, table)?;
            if thing.groups.insert(kind, group).is_some() {
                return Err(CodecError::ImpossibleLength {
                    offset: type_offset,
                    reason: format!("outfit {id} repeats frame group {kind:?}"),
                });
            }
        }
    } else {
        let group = read_group(r, FrameGroupType::Default, category, table)?;
        thing.groups.insert(FrameGroupType::Default, group);
    }
    Ok(thing)
}

fn read_flags(r: &mut ByteReader<'_>, thing: &mut Thing, table: &FieldTable) -> CodecResult<()> {
    loop {
        let offset = r.position();
        let code = r.u8()?;
        if code == LAST_FLAG {
            return Ok(());
        }
        match table.entry(code) {
            Some(FlagEntry::Property(kind)) => {
                let property = read_property(r, kind, table)?;
                thing.set_property(property);
            }
            Some(FlagEntry::Reserved { width }) => {
                warn!(
                    category = %thing.category,
                    id = thing.id,
                    code = format_args!("{code:#04x}"),
                    width,
                    "skipping reserved flag"
                );
                r.skip(width)?;
            }
            None => return Err(CodecError::UnknownFlag { code, offset }),
        }
    }
}

fn read_property(
    r: &mut ByteReader<'_>,
    kind: PropertyKind,
    table: &FieldTable,
) -> CodecResult<ThingProperty> {
    let property = match kind {
        PropertyKind::Ground => ThingProperty::Ground { speed: r.u16()? },
        PropertyKind::Writable => ThingProperty::Writable {
            max_length: r.u16()?,
        },
        PropertyKind::WritableOnce => ThingProperty::WritableOnce {
            max_length: r.u16()?,
        },
        PropertyKind::Light => ThingProperty::Light {
            level: r.u16()?,
            color: r.u16()?,
        },
        PropertyKind::Offset if table.flags.offset_has_payload() => ThingProperty::Offset {
            x: r.i16()?,
            y: r.i16()?,
        },
        PropertyKind::Offset => ThingProperty::Offset { x: 8, y: 8 },
        PropertyKind::Elevation => ThingProperty::Elevation { height: r.u16()? },
        PropertyKind::MiniMap => ThingProperty::MiniMap { color: r.u16()? },
        PropertyKind::LensHelp => ThingProperty::LensHelp { kind: r.u16()? },
        PropertyKind::Cloth => ThingProperty::Cloth { slot: r.u16()? },
        PropertyKind::DefaultAction => ThingProperty::DefaultAction { action: r.u16()? },
        PropertyKind::Market => ThingProperty::Market(MarketInfo {
            category: r.u16()?,
            trade_as: r.u16()?,
            show_as: r.u16()?,
            name: r.string()?,
            restrict_profession: r.u16()?,
            restrict_level: r.u16()?,
        }),
        unit => unit
            .unit_property()
            .ok_or_else(|| CodecError::ImpossibleLength {
                offset: r.position(),
                reason: format!("no payload layout for {unit:?}"),
            })?,
    };
    Ok(property)
}

fn read_group(
    r: &mut ByteReader<'_>,
    kind: FrameGroupType,
    category: ThingCategory,
    table: &FieldTable,
) -> CodecResult<FrameGroup> {
    let offset = r.position();
    let mut group = FrameGroup::new(kind);
    group.width = r.u8()?;
    group.height = r.u8()?;
    group.exact_size = if group.width > 1 || group.height > 1 {
        r.u8()?
    } else {
        SPRITE_SIZE as u8
    };
    group.layers = r.u8()?;
    group.pattern_x = r.u8()?;
    group.pattern_y = r.u8()?;
    group.pattern_z = if table.has_pattern_z { r.u8()? } else { 1 };
    group.phases = r.u8()?;

    if group.phase_len() == 0 || group.phases == 0 {
        return Err(CodecError::ImpossibleLength {
            offset,
            reason: "frame group has a zero dimension".into(),
        });
    }

    group.animation = if group.phases > 1 {
        if table.has_frame_durations() {
            let mode = AnimationMode::from_byte(r.u8()?);
            let loop_count = r.i32()?;
            let start_phase = r.i8()?;
            let mut durations = Vec::with_capacity(group.phases as usize);
            for _ in 0..group.phases {
                durations.push(FrameDuration::new(r.u32()?, r.u32()?));
            }
            Some(FrameAnimation {
                mode,
                loop_count,
                start_phase,
                durations,
            })
        } else {
            Some(FrameAnimation::with_defaults(group.phases, category))
        }
    } else {
        None
    };

    let count = group.expected_len();
    let width = table.sprite_ids.bytes();
    if count * width > r.remaining() {
        return Err(CodecError::Truncated {
            offset: r.position(),
            needed: count * width - r.remaining(),
        });
    }
    group.sprites = Vec::with_capacity(count);
    for _ in 0..count {
        let id = match table.sprite_ids {
            IdWidth::U16 => r.u16()? as u32,
            IdWidth::U32 => r.u32()?,
        };
        group.sprites.push(SpriteRef::Resolved(id));
    }
    Ok(group)
}

/// Encode one thing record.
pub fn write_thing(w: &mut ByteWriter, thing: &Thing, table: &FieldTable) -> CodecResult<()> {
    let invalid = |reason: &str| CodecError::InvalidThing {
        category: thing.category,
        id: thing.id,
        reason: reason.to_string(),
    };

    if thing.has_pending_sprites() {
        return Err(CodecError::PendingSprite {
            category: thing.category,
            id: thing.id,
        });
    }
    if !thing.is_consistent() {
        return Err(invalid("frame group dimensions disagree with the sprite table"));
    }

    let grouped = thing.category == ThingCategory::Outfit && table.has_frame_groups();
    let groups: Vec<&FrameGroup> = thing.groups.values().collect();
    if grouped {
        let split = thing.group(FrameGroupType::Idle).is_some()
            && thing.group(FrameGroupType::Walking).is_some()
            && groups.len() == 2;
        let single = groups.len() == 1 && thing.group(FrameGroupType::Default).is_some();
        if !split && !single {
            return Err(invalid("outfit groups must be Default alone or Idle with Walking"));
        }
    } else if groups.len() != 1 {
        return Err(invalid("format stores a single frame group"));
    }

    write_flags(w, thing, table);

    if grouped {
        w.u8(groups.len() as u8);
    }
    for group in groups {
        if grouped {
            w.u8(group.kind.to_byte());
        }
        write_group(w, thing, group, table)?;
    }
    Ok(())
}

fn write_flags(w: &mut ByteWriter, thing: &Thing, table: &FieldTable) {
    for &(code, kind) in table.flags.entries() {
        let Some(property) = thing.property(kind) else {
            continue;
        };
        w.u8(code);
        match property {
            ThingProperty::Ground { speed } => w.u16(*speed),
            ThingProperty::Writable { max_length } | ThingProperty::WritableOnce { max_length } => {
                w.u16(*max_length)
            }
            ThingProperty::Light { level, color } => {
                w.u16(*level);
                w.u16(*color);
            }
            ThingProperty::Offset { x, y } => {
                if table.flags.offset_has_payload() {
                    w.i16(*x);
                    w.i16(*y);
                }
            }
            ThingProperty::Elevation { height } => w.u16(*height),
            ThingProperty::MiniMap { color } => w.u16(*color),
            ThingProperty::LensHelp { kind } => w.u16(*kind),
            ThingProperty::Cloth { slot } => w.u16(*slot),
            ThingProperty::DefaultAction { action } => w.u16(*action),
            ThingProperty::Market(market) => {
                w.u16(market.category);
                w.u16(market.trade_as);
                w.u16(market.show_as);
                w.string(&market.name);
                w.u16(market.restrict_profession);
                w.u16(market.restrict_level);
            }
            _ => {}
        }
    }
    for kind in thing.properties.keys() {
        if table.flags.code(*kind).is_none() {
            debug!(
                category = %thing.category,
                id = thing.id,
                ?kind,
                version = table.version,
                "property has no flag code in this version"
            );
        }
    }
    w.u8(LAST_FLAG);
}

fn write_group(
    w: &mut ByteWriter,
    thing: &Thing,
    group: &FrameGroup,
    table: &FieldTable,
) -> CodecResult<()> {
    if !table.has_pattern_z && group.pattern_z != 1 {
        return Err(CodecError::InvalidThing {
            category: thing.category,
            id: thing.id,
            reason: format!("pattern Z {} needs version 7.55 or later", group.pattern_z),
        });
    }
    w.u8(group.width);
    w.u8(group.height);
    if group.width > 1 || group.height > 1 {
        w.u8(group.exact_size);
    }
    w.u8(group.layers);
    w.u8(group.pattern_x);
    w.u8(group.pattern_y);
    if table.has_pattern_z {
        w.u8(group.pattern_z);
    }
    w.u8(group.phases);

    if group.phases > 1 && table.has_frame_durations() {
        let defaults;
        let animation = match &group.animation {
            Some(animation) => animation,
            None => {
                defaults = FrameAnimation::with_defaults(group.phases, thing.category);
                &defaults
            }
        };
        w.u8(animation.mode.to_byte());
        w.i32(animation.loop_count);
        w.i8(animation.start_phase);
        for duration in &animation.durations {
            w.u32(duration.minimum);
            w.u32(duration.maximum);
        }
    }

    let max = table.sprite_ids.max_id();
    for sprite in &group.sprites {
        let id = match sprite {
            SpriteRef::Resolved(id) => *id,
            SpriteRef::Pending => {
                return Err(CodecError::PendingSprite {
                    category: thing.category,
                    id: thing.id,
                })
            }
        };
        if id > max {
            return Err(CodecError::IdOverflow {
                id,
                bits: table.sprite_ids.bits(),
            });
        }
        match table.sprite_ids {
            IdWidth::U16 => w.u16(id as u16),
            IdWidth::U32 => w.u32(id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_types::{FormatFeatures, VersionTable};

    fn table(value: u32) -> FieldTable {
        FieldTable::new(
            VersionTable::builtin().require(value).unwrap(),
            FormatFeatures::default(),
        )
    }

    fn roundtrip(thing: &Thing, table: &FieldTable) -> Thing {
        let mut w = ByteWriter::new();
        write_thing(&mut w, thing, table).unwrap();
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        let decoded = read_thing(&mut r, thing.id, thing.category, table).unwrap();
        assert_eq!(r.remaining(), 0);
        decoded
    }

    fn animated_item() -> Thing {
        let mut thing = Thing::new(100, ThingCategory::Item)
            .with_property(ThingProperty::Ground { speed: 150 })
            .with_property(ThingProperty::Pickupable)
            .with_property(ThingProperty::Light { level: 3, color: 215 });
        let group = thing.group_mut(FrameGroupType::Default).unwrap();
        group.width = 2;
        group.height = 2;
        group.exact_size = 64;
        group.phases = 2;
        group.sprites = (1..=8).map(SpriteRef::Resolved).collect();
        group.reset_animation(ThingCategory::Item);
        thing
    }

    #[test]
    fn item_roundtrip_modern() {
        let mut thing = animated_item();
        thing.set_property(ThingProperty::Market(MarketInfo {
            category: 3,
            trade_as: 100,
            show_as: 100,
            name: "golden helmet".into(),
            restrict_profession: 0,
            restrict_level: 8,
        }));
        let t = table(1098);
        assert_eq!(roundtrip(&thing, &t), thing);
    }

    #[test]
    fn item_roundtrip_legacy_without_durations() {
        let thing = animated_item();
        let t = table(760);
        assert_eq!(roundtrip(&thing, &t), thing);
    }

    #[test]
    fn flags_written_in_code_order() {
        let thing = Thing::new(100, ThingCategory::Item)
            .with_property(ThingProperty::Pickupable)
            .with_property(ThingProperty::Container);
        let mut w = ByteWriter::new();
        write_thing(&mut w, &thing, &table(1098)).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..3], &[0x04, 0x11, LAST_FLAG]);
    }

    #[test]
    fn unmapped_property_is_dropped() {
        let thing = Thing::new(100, ThingCategory::Item).with_property(ThingProperty::TopEffect);
        let decoded = roundtrip(&thing, &table(860));
        assert!(!decoded.has_property(PropertyKind::TopEffect));
    }

    #[test]
    fn legacy_offset_has_no_payload() {
        let thing =
            Thing::new(100, ThingCategory::Item).with_property(ThingProperty::Offset { x: 8, y: 8 });
        let t = table(710);
        let mut w = ByteWriter::new();
        write_thing(&mut w, &thing, &t).unwrap();
        assert_eq!(w.into_inner()[..2], [0x14, LAST_FLAG]);
        assert_eq!(roundtrip(&thing, &t), thing);
    }

    #[test]
    fn outfit_frame_groups_roundtrip() {
        let mut thing = Thing::new(1, ThingCategory::Outfit);
        thing.groups.clear();
        let idle = FrameGroup::new(FrameGroupType::Idle);
        let mut walking = FrameGroup::new(FrameGroupType::Walking);
        walking.phases = 3;
        walking.sprites = vec![SpriteRef::Resolved(4); 3];
        walking.reset_animation(ThingCategory::Outfit);
        thing.groups.insert(FrameGroupType::Idle, idle);
        thing.groups.insert(FrameGroupType::Walking, walking);

        let t = table(1098);
        assert_eq!(roundtrip(&thing, &t), thing);
    }

    #[test]
    fn single_group_outfit_in_group_mode_is_default() {
        let thing = Thing::new(1, ThingCategory::Outfit);
        let t = table(1098);
        let decoded = roundtrip(&thing, &t);
        assert!(decoded.group(FrameGroupType::Default).is_some());
    }

    #[test]
    fn split_groups_rejected_without_group_support() {
        let mut thing = Thing::new(1, ThingCategory::Outfit);
        thing.groups.clear();
        thing.groups.insert(FrameGroupType::Idle, FrameGroup::new(FrameGroupType::Idle));
        thing
            .groups
            .insert(FrameGroupType::Walking, FrameGroup::new(FrameGroupType::Walking));
        let mut w = ByteWriter::new();
        let err = write_thing(&mut w, &thing, &table(860)).unwrap_err();
        assert!(matches!(err, CodecError::InvalidThing { .. }));
    }

    #[test]
    fn pending_sprite_rejected() {
        let mut thing = Thing::new(100, ThingCategory::Item);
        thing.group_mut(FrameGroupType::Default).unwrap().sprites = vec![SpriteRef::Pending];
        let mut w = ByteWriter::new();
        assert!(matches!(
            write_thing(&mut w, &thing, &table(1098)),
            Err(CodecError::PendingSprite { id: 100, .. })
        ));
    }

    #[test]
    fn narrow_ids_overflow() {
        let mut thing = Thing::new(100, ThingCategory::Item);
        thing.group_mut(FrameGroupType::Default).unwrap().sprites =
            vec![SpriteRef::Resolved(70_000)];
        let mut w = ByteWriter::new();
        assert!(matches!(
            write_thing(&mut w, &thing, &table(860)),
            Err(CodecError::IdOverflow { id: 70_000, bits: 16 })
        ));
    }

    #[test]
    fn unknown_flag_is_fatal() {
        let bytes = [0x77, LAST_FLAG];
        let mut r = ByteReader::new(&bytes);
        let err = read_thing(&mut r, 100, ThingCategory::Item, &table(1098)).unwrap_err();
        assert!(matches!(err, CodecError::UnknownFlag { code: 0x77, offset: 0 }));
    }

    #[test]
    fn reserved_flag_is_skipped() {
        let t = table(1098).with_reserved_flag(0x77, 2);
        // reserved flag + payload, terminator, 1x1 group with one sprite
        let bytes = [0x77, 0xAA, 0xBB, LAST_FLAG, 1, 1, 1, 1, 1, 1, 1, 5, 0, 0, 0];
        let mut r = ByteReader::new(&bytes);
        let thing = read_thing(&mut r, 100, ThingCategory::Item, &t).unwrap();
        assert!(thing.properties.is_empty());
        assert_eq!(thing.sprite_ids().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn truncated_sprite_table() {
        // 2x2 group claims 4 sprites but carries one
        let bytes = [LAST_FLAG, 2, 2, 32, 1, 1, 1, 1, 1, 1, 0, 0, 0];
        let mut r = ByteReader::new(&bytes);
        let err = read_thing(&mut r, 100, ThingCategory::Item, &table(1098)).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn zero_dimension_is_impossible() {
        let bytes = [LAST_FLAG, 0, 1, 1, 1, 1, 1, 1];
        let mut r = ByteReader::new(&bytes);
        let err = read_thing(&mut r, 100, ThingCategory::Item, &table(1098)).unwrap_err();
        assert!(matches!(err, CodecError::ImpossibleLength { .. }));
    }
}
