use std::fmt;

use forge_store::ThingStore;
use forge_types::{
    FrameAnimation, FrameDuration, FrameGroup, FrameGroupType, ProgressKind, ProgressSink,
    Reporter, SpriteRef, Thing, ThingCategory, ThingId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConvertError, ConvertResult};

/// Walk cycle length synthesized for outfits that have no walk phases.
pub const DEFAULT_WALKING_PHASES: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// `Default` to `Idle` + `Walking`.
    ToFrameGroups,
    /// `Idle` + `Walking` to `Default`.
    ToLegacy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Phases given to a synthesized walking group.
    pub walking_phases: u8,
    /// Add a mount layer (doubling pattern Z with blank entries) when
    /// splitting, or drop the upper half of pattern Z when collapsing.
    pub mount: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            walking_phases: DEFAULT_WALKING_PHASES,
            mount: false,
        }
    }
}

/// Data a legacy collapse could not keep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LossKind {
    /// Idle phases after the first.
    IdlePhases(u8),
    /// Idle and walking groups differ in shape; walking was dropped.
    ShapeMismatch,
    /// Walking phases past the 255 phase limit.
    PhaseOverflow(usize),
    /// Upper half of pattern Z.
    MountLayer,
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdlePhases(n) => write!(f, "dropped {n} extra idle phases"),
            Self::ShapeMismatch => f.write_str("walking group shape differs from idle, dropped walking"),
            Self::PhaseOverflow(n) => write!(f, "dropped {n} walking phases past the phase limit"),
            Self::MountLayer => f.write_str("dropped mount layer"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loss {
    pub id: ThingId,
    pub kind: LossKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionReport {
    pub direction: Direction,
    /// Outfits whose layout changed.
    pub converted: usize,
    pub lossy: Vec<Loss>,
}

impl ConversionReport {
    pub fn is_lossy(&self) -> bool {
        !self.lossy.is_empty()
    }
}

/// Rewrites the frame group layout of every outfit in a store.
pub struct FrameGroupConverter<'a> {
    options: ConvertOptions,
    chunk: usize,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> FrameGroupConverter<'a> {
    pub fn new(options: ConvertOptions, chunk: usize, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            options,
            chunk: chunk.max(1),
            sink,
        }
    }

    /// Convert all outfits and flip the store's frame group flag. Nothing
    /// changes unless every outfit converts.
    pub fn run(&mut self, things: &mut ThingStore, direction: Direction) -> ConvertResult<ConversionReport> {
        if self.options.walking_phases == 0 {
            return Err(ConvertError::InvalidOptions("walking phases must be at least 1".into()));
        }

        let outfits = things.things(ThingCategory::Outfit);
        let mut reporter = Reporter::new(
            ProgressKind::ConvertFrameGroups,
            ThingCategory::Outfit.as_str(),
            outfits.len(),
            self.chunk,
        );
        let mut report = ConversionReport {
            direction,
            converted: 0,
            lossy: Vec::new(),
        };
        let mut staged = Vec::new();
        for batch in outfits.chunks(self.chunk) {
            for outfit in batch {
                let next = match direction {
                    Direction::ToFrameGroups => self.split(outfit)?,
                    Direction::ToLegacy => self.collapse(outfit, &mut report.lossy)?,
                };
                if let Some(next) = next {
                    staged.push(next);
                }
            }
            reporter.advance(batch.len(), self.sink);
        }
        reporter.finish(self.sink);
        report.converted = staged.len();

        match direction {
            Direction::ToFrameGroups => {
                let previous = things.features().frame_groups;
                things.set_frame_groups(true);
                if let Err(e) = things.replace_things(staged) {
                    things.set_frame_groups(previous);
                    return Err(e.into());
                }
            }
            Direction::ToLegacy => {
                things.replace_things(staged)?;
                things.set_frame_groups(false);
            }
        }

        for loss in &report.lossy {
            warn!(outfit = loss.id, loss = %loss.kind, "lossy frame group conversion");
        }
        info!(?direction, converted = report.converted, lossy = report.lossy.len(), "frame group conversion complete");
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Legacy -> Idle/Walking
    // ------------------------------------------------------------------

    fn split(&self, outfit: &Thing) -> ConvertResult<Option<Thing>> {
        let Some(legacy) = outfit.group(FrameGroupType::Default) else {
            return Ok(None);
        };

        let mut idle = legacy.clone();
        idle.kind = FrameGroupType::Idle;
        idle.phases = 1;
        idle.sprites = legacy.phase_sprites(0).to_vec();
        idle.animation = None;

        // animated walks keep every legacy phase, stand included
        let mut walking = legacy.clone();
        walking.kind = FrameGroupType::Walking;
        if legacy.phases == 1 {
            walking.phases = self.options.walking_phases;
            walking.sprites = idle.sprites.repeat(walking.phases as usize);
            walking.reset_animation(ThingCategory::Outfit);
        }

        if self.options.mount {
            add_mount_layer(&mut idle, outfit.id)?;
            add_mount_layer(&mut walking, outfit.id)?;
        }

        let mut next = outfit.clone();
        next.groups.clear();
        next.groups.insert(FrameGroupType::Idle, idle);
        next.groups.insert(FrameGroupType::Walking, walking);
        debug!(outfit = outfit.id, "split into idle and walking");
        Ok(Some(next))
    }

    // ------------------------------------------------------------------
    // Idle/Walking -> Legacy
    // ------------------------------------------------------------------

    fn collapse(&self, outfit: &Thing, lossy: &mut Vec<Loss>) -> ConvertResult<Option<Thing>> {
        let Some(idle) = outfit.group(FrameGroupType::Idle) else {
            return Ok(None);
        };
        let mut lose = |kind| lossy.push(Loss { id: outfit.id, kind });
        if idle.phases > 1 {
            lose(LossKind::IdlePhases(idle.phases - 1));
        }

        let stand = idle.phase_sprites(0).to_vec();
        let stand_duration = idle
            .animation
            .as_ref()
            .and_then(|a| a.durations.first().copied())
            .unwrap_or_else(|| FrameDuration::default_for(ThingCategory::Outfit));

        let mut legacy = idle.clone();
        legacy.kind = FrameGroupType::Default;
        legacy.phases = 1;
        legacy.sprites = stand.clone();
        legacy.animation = None;

        match outfit.group(FrameGroupType::Walking) {
            Some(walking) if !walking.same_shape(idle) => lose(LossKind::ShapeMismatch),
            Some(walking) if walking.sprites.chunks(walking.phase_len()).all(|p| p == stand.as_slice()) => {}
            Some(walking) if walking.phase_sprites(0) == stand.as_slice() => {
                legacy = walking.clone();
                legacy.kind = FrameGroupType::Default;
            }
            Some(walking) => {
                let room = u8::MAX as usize - 1;
                let kept = (walking.phases as usize).min(room);
                if kept < walking.phases as usize {
                    lose(LossKind::PhaseOverflow(walking.phases as usize - kept));
                }
                legacy.phases = 1 + kept as u8;
                legacy
                    .sprites
                    .extend_from_slice(&walking.sprites[..kept * walking.phase_len()]);
                let mut animation = walking
                    .animation
                    .clone()
                    .unwrap_or_else(|| FrameAnimation::with_defaults(walking.phases, ThingCategory::Outfit));
                animation.durations.truncate(kept);
                animation.durations.insert(0, stand_duration);
                animation.start_phase = 0;
                legacy.animation = Some(animation);
            }
            None => {}
        }

        if self.options.mount && legacy.pattern_z > 1 {
            drop_mount_layer(&mut legacy);
            lose(LossKind::MountLayer);
        }

        let mut next = outfit.clone();
        next.groups.clear();
        next.groups.insert(FrameGroupType::Default, legacy);
        Ok(Some(next))
    }
}

/// Double pattern Z, filling the new layers with blanks. Pattern Z is the
/// outermost axis inside a phase, so each phase gains one trailing block.
fn add_mount_layer(group: &mut FrameGroup, id: ThingId) -> ConvertResult<()> {
    let Some(pattern_z) = group.pattern_z.checked_mul(2) else {
        return Err(ConvertError::Unconvertible {
            id,
            reason: format!("pattern z {} cannot hold a mount layer", group.pattern_z),
        });
    };
    let block = group.phase_len();
    let mut sprites = Vec::with_capacity(group.sprites.len() * 2);
    for phase in group.sprites.chunks(block) {
        sprites.extend_from_slice(phase);
        sprites.extend(std::iter::repeat(SpriteRef::BLANK).take(block));
    }
    group.sprites = sprites;
    group.pattern_z = pattern_z;
    Ok(())
}

fn drop_mount_layer(group: &mut FrameGroup) {
    let block = group.phase_len();
    group.pattern_z /= 2;
    let keep = group.phase_len();
    group.sprites = group
        .sprites
        .chunks(block)
        .flat_map(|phase| phase[..keep].iter().copied())
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_types::{ClientVersion, FormatFeatures, NoProgress, ProgressEvent, VersionTable};

    fn version(value: u32) -> ClientVersion {
        VersionTable::builtin().require(value).unwrap().clone()
    }

    fn outfit(phases: u8, first: u32) -> Thing {
        let mut thing = Thing::new(0, ThingCategory::Outfit);
        let group = thing.group_mut(FrameGroupType::Default).unwrap();
        group.pattern_x = 4;
        group.phases = phases;
        group.sprites = (0..4 * phases as u32).map(|i| SpriteRef::Resolved(first + i)).collect();
        group.reset_animation(ThingCategory::Outfit);
        thing
    }

    fn legacy_store(things: Vec<Thing>) -> ThingStore {
        let mut store = ThingStore::create_new(&version(860), FormatFeatures::default());
        store.add_things(things).unwrap();
        store
    }

    fn convert(store: &mut ThingStore, direction: Direction, options: ConvertOptions) -> ConversionReport {
        let mut sink = NoProgress;
        FrameGroupConverter::new(options, 16, &mut sink)
            .run(store, direction)
            .unwrap()
    }

    fn ids(group: &FrameGroup) -> Vec<u32> {
        group.sprites.iter().map(|r| r.id().unwrap()).collect()
    }

    #[test]
    fn single_phase_outfit_gets_default_walk_cycle() {
        let mut store = legacy_store(vec![outfit(1, 10)]);
        let report = convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
        assert_eq!(report.converted, 1);
        assert!(store.features().frame_groups);

        let thing = store.get_thing(1, ThingCategory::Outfit).unwrap();
        let idle = thing.group(FrameGroupType::Idle).unwrap();
        let walking = thing.group(FrameGroupType::Walking).unwrap();
        assert_eq!(idle.phases, 1);
        assert_eq!(ids(idle), vec![10, 11, 12, 13]);
        assert_eq!(walking.phases, DEFAULT_WALKING_PHASES);
        assert!(walking.is_consistent());
        assert_eq!(&ids(walking)[..4], &[10, 11, 12, 13]);
    }

    #[test]
    fn animated_outfit_splits_stand_and_walk() {
        let mut store = legacy_store(vec![outfit(3, 1)]);
        convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
        let thing = store.get_thing(1, ThingCategory::Outfit).unwrap();
        let idle = thing.group(FrameGroupType::Idle).unwrap();
        let walking = thing.group(FrameGroupType::Walking).unwrap();
        assert_eq!(ids(idle), vec![1, 2, 3, 4]);
        assert!(idle.animation.is_none());
        assert_eq!(walking.phases, 3);
        assert_eq!(ids(walking), (1..=12).collect::<Vec<_>>());
        assert_eq!(walking.animation.as_ref().unwrap().durations.len(), 3);
    }

    #[test]
    fn non_outfits_are_left_alone() {
        let mut store = legacy_store(vec![]);
        let mut item = Thing::new(0, ThingCategory::Item);
        item.group_mut(FrameGroupType::Default).unwrap().sprites = vec![SpriteRef::Resolved(9)];
        store.add_thing(item.clone()).unwrap();
        convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
        let stored = store.get_thing(100, ThingCategory::Item).unwrap();
        assert_eq!(stored.groups, item.groups);
    }

    #[test]
    fn split_then_collapse_restores_legacy_layout() {
        let original = outfit(5, 20);
        let mut store = legacy_store(vec![original.clone()]);
        convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
        let report = convert(&mut store, Direction::ToLegacy, ConvertOptions::default());
        assert!(!report.is_lossy());
        assert!(!store.features().frame_groups);
        let restored = store.get_thing(1, ThingCategory::Outfit).unwrap();
        assert_eq!(restored.groups, original.groups);
    }

    #[test]
    fn split_then_collapse_keeps_custom_durations() {
        for timings in [
            vec![(111, 111), (222, 222), (333, 333)],
            vec![(150, 175), (420, 480)],
        ] {
            let mut original = outfit(timings.len() as u8, 1);
            let group = original.group_mut(FrameGroupType::Default).unwrap();
            let animation = group.animation.as_mut().unwrap();
            animation.durations = timings.iter().map(|(a, b)| FrameDuration::new(*a, *b)).collect();
            animation.loop_count = 3;

            let mut store = legacy_store(vec![original.clone()]);
            convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
            let walking = store
                .get_thing(1, ThingCategory::Outfit)
                .unwrap()
                .group(FrameGroupType::Walking)
                .unwrap()
                .clone();
            assert_eq!(walking.animation.as_ref().unwrap().durations.len(), timings.len());

            let report = convert(&mut store, Direction::ToLegacy, ConvertOptions::default());
            assert!(!report.is_lossy());
            let restored = store.get_thing(1, ThingCategory::Outfit).unwrap();
            assert_eq!(restored.groups, original.groups);
        }
    }

    #[test]
    fn walk_without_stand_phase_is_prefixed() {
        let mut store = ThingStore::create_new(&version(1098), FormatFeatures::default());
        let mut thing = Thing::new(0, ThingCategory::Outfit);
        thing.groups.clear();
        let mut idle = FrameGroup::new(FrameGroupType::Idle);
        idle.sprites = vec![SpriteRef::Resolved(1)];
        let mut walking = FrameGroup::new(FrameGroupType::Walking);
        walking.phases = 2;
        walking.sprites = vec![SpriteRef::Resolved(2), SpriteRef::Resolved(3)];
        walking.reset_animation(ThingCategory::Outfit);
        thing.groups.insert(FrameGroupType::Idle, idle);
        thing.groups.insert(FrameGroupType::Walking, walking);
        store.add_thing(thing).unwrap();

        let report = convert(&mut store, Direction::ToLegacy, ConvertOptions::default());
        assert!(!report.is_lossy());
        let group = store.get_thing(1, ThingCategory::Outfit).unwrap().group(FrameGroupType::Default).unwrap();
        assert_eq!(group.phases, 3);
        assert_eq!(ids(group), vec![1, 2, 3]);
        assert_eq!(group.animation.as_ref().unwrap().durations.len(), 3);
    }

    #[test]
    fn synthesized_walk_collapses_to_one_phase() {
        let mut store = legacy_store(vec![outfit(1, 7)]);
        convert(&mut store, Direction::ToFrameGroups, ConvertOptions::default());
        convert(&mut store, Direction::ToLegacy, ConvertOptions::default());
        let restored = store.get_thing(1, ThingCategory::Outfit).unwrap();
        let group = restored.group(FrameGroupType::Default).unwrap();
        assert_eq!(group.phases, 1);
        assert_eq!(ids(group), vec![7, 8, 9, 10]);
    }

    #[test]
    fn collapse_reports_every_loss() {
        let mut store = ThingStore::create_new(&version(1098), FormatFeatures::default());
        let mut thing = Thing::new(0, ThingCategory::Outfit);
        thing.groups.clear();
        let mut idle = FrameGroup::new(FrameGroupType::Idle);
        idle.phases = 2;
        idle.sprites = vec![SpriteRef::Resolved(1), SpriteRef::Resolved(2)];
        idle.reset_animation(ThingCategory::Outfit);
        let mut walking = FrameGroup::new(FrameGroupType::Walking);
        walking.width = 2;
        walking.sprites = vec![SpriteRef::Resolved(3), SpriteRef::Resolved(4)];
        thing.groups.insert(FrameGroupType::Idle, idle);
        thing.groups.insert(FrameGroupType::Walking, walking);
        store.add_thing(thing).unwrap();

        let report = convert(&mut store, Direction::ToLegacy, ConvertOptions::default());
        let kinds: Vec<LossKind> = report.lossy.iter().map(|l| l.kind.clone()).collect();
        assert_eq!(kinds, vec![LossKind::IdlePhases(1), LossKind::ShapeMismatch]);
        let group = store.get_thing(1, ThingCategory::Outfit).unwrap().group(FrameGroupType::Default).unwrap();
        assert_eq!(ids(group), vec![1]);
    }

    #[test]
    fn mount_layer_roundtrip() {
        let options = ConvertOptions {
            mount: true,
            ..ConvertOptions::default()
        };
        let original = outfit(2, 1);
        let mut store = legacy_store(vec![original.clone()]);
        convert(&mut store, Direction::ToFrameGroups, options);
        let thing = store.get_thing(1, ThingCategory::Outfit).unwrap();
        let idle = thing.group(FrameGroupType::Idle).unwrap();
        assert_eq!(idle.pattern_z, 2);
        assert_eq!(ids(idle), vec![1, 2, 3, 4, 0, 0, 0, 0]);

        let report = convert(&mut store, Direction::ToLegacy, options);
        assert_eq!(report.lossy, vec![Loss { id: 1, kind: LossKind::MountLayer }]);
        let restored = store.get_thing(1, ThingCategory::Outfit).unwrap();
        assert_eq!(restored.groups, original.groups);
    }

    #[test]
    fn zero_walking_phases_rejected_without_change() {
        let mut store = legacy_store(vec![outfit(1, 1)]);
        let mut sink = NoProgress;
        let options = ConvertOptions {
            walking_phases: 0,
            mount: false,
        };
        let result = FrameGroupConverter::new(options, 16, &mut sink).run(&mut store, Direction::ToFrameGroups);
        assert!(matches!(result, Err(ConvertError::InvalidOptions(_))));
        assert!(!store.features().frame_groups);
    }

    #[test]
    fn progress_counts_outfits() {
        let mut store = legacy_store(vec![outfit(1, 1), outfit(1, 5), outfit(1, 9)]);
        let mut events: Vec<ProgressEvent> = Vec::new();
        FrameGroupConverter::new(ConvertOptions::default(), 2, &mut events)
            .run(&mut store, Direction::ToFrameGroups)
            .unwrap();
        let last = events.last().unwrap();
        assert_eq!((last.loaded, last.total), (3, 3));
        assert_eq!(last.id, ProgressKind::ConvertFrameGroups);
    }
}
