use std::path::Path;

use forge_store::{SpriteStore, ThingStore};
use forge_types::{
    ClientVersion, FormatFeatures, ProgressKind, ProgressSink, Reporter, SpriteId, SpriteRef,
    Thing, ThingCategory, ThingId,
};
use tracing::{info, warn};

use crate::error::{MergeError, MergeResult};

/// What a merge added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Things added per category, indexed by [`ThingCategory::index`].
    pub things_added: [usize; 4],
    /// First id assigned per category, if any were added.
    pub first_ids: [Option<ThingId>; 4],
    pub sprites_added: u32,
    /// Amount every source sprite id was shifted by.
    pub sprite_offset: u32,
    /// Source references that pointed past the source sprite file and
    /// were blanked.
    pub dangling_refs: usize,
}

impl MergeReport {
    pub fn added(&self, category: ThingCategory) -> usize {
        self.things_added[category.index()]
    }

    pub fn total_things(&self) -> usize {
        self.things_added.iter().sum()
    }
}

/// Runs merges in bounded chunks, reporting progress after each.
pub struct Merger<'a> {
    chunk: usize,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> Merger<'a> {
    pub fn new(chunk: usize, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            chunk: chunk.max(1),
            sink,
        }
    }

    /// Load a source pair from disk and merge it.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        things: &mut ThingStore,
        sprites: &mut SpriteStore,
        dat: &Path,
        spr: &Path,
        version: &ClientVersion,
        features: FormatFeatures,
    ) -> MergeResult<MergeReport> {
        let source_things = ThingStore::load(dat, version, features)?;
        let source_sprites = SpriteStore::load(spr, version, features)?;
        self.merge(things, sprites, &source_things, &source_sprites)
    }

    /// Append `source_*` to `things`/`sprites`. Nothing changes unless the
    /// whole merge succeeds.
    pub fn merge(
        &mut self,
        things: &mut ThingStore,
        sprites: &mut SpriteStore,
        source_things: &ThingStore,
        source_sprites: &SpriteStore,
    ) -> MergeResult<MergeReport> {
        let offset = sprites.sprites_count();
        let incoming = source_sprites.sprites_count();
        if offset as u64 + incoming as u64 > sprites.capacity() as u64 {
            return Err(MergeError::Capacity(format!(
                "{offset} + {incoming} sprites exceed {}",
                sprites.capacity()
            )));
        }
        for category in ThingCategory::ALL {
            let total = things.count(category) + source_things.count(category);
            let last = category.min_id() as u64 + total as u64 - 1;
            if last > category.max_id_capacity() as u64 {
                return Err(MergeError::Capacity(format!(
                    "{category} ids would reach {last}"
                )));
            }
        }

        // stage on copies, swap in on success
        let mut staged_things = things.clone();
        let mut staged_sprites = sprites.clone();
        let mut report = MergeReport {
            sprite_offset: offset,
            ..MergeReport::default()
        };

        let mut reporter = Reporter::new(ProgressKind::Merge, "sprites", incoming as usize, self.chunk);
        let ids: Vec<SpriteId> = (1..=incoming).collect();
        for batch in ids.chunks(self.chunk) {
            let pixels = batch
                .iter()
                .map(|id| source_sprites.resolve_pixels(*id).pixels.to_vec())
                .collect();
            staged_sprites.add_sprites(pixels)?;
            reporter.advance(batch.len(), self.sink);
        }
        reporter.finish(self.sink);
        report.sprites_added = incoming;

        for category in ThingCategory::ALL {
            let source = source_things.things(category);
            reporter.restart(category.as_str(), source.len());
            for batch in source.chunks(self.chunk) {
                let shifted: Vec<Thing> = batch
                    .iter()
                    .map(|thing| shift(thing, offset, incoming, &mut report.dangling_refs))
                    .collect();
                let added = staged_things.append_things(shifted)?;
                if report.first_ids[category.index()].is_none() {
                    report.first_ids[category.index()] = added.first().copied();
                }
                report.things_added[category.index()] += added.len();
                reporter.advance(batch.len(), self.sink);
            }
            reporter.finish(self.sink);
        }

        *things = staged_things;
        *sprites = staged_sprites;
        if report.dangling_refs > 0 {
            warn!(count = report.dangling_refs, "blanked dangling source references");
        }
        info!(
            items = report.added(ThingCategory::Item),
            outfits = report.added(ThingCategory::Outfit),
            effects = report.added(ThingCategory::Effect),
            missiles = report.added(ThingCategory::Missile),
            sprites = report.sprites_added,
            offset,
            "merge complete"
        );
        Ok(report)
    }
}

fn shift(thing: &Thing, offset: u32, source_count: u32, dangling: &mut usize) -> Thing {
    let mut copy = thing.clone();
    for sprite in copy.sprite_refs_mut() {
        if let Some(id) = sprite.sprite_id() {
            *sprite = if id <= source_count {
                SpriteRef::Resolved(id + offset)
            } else {
                *dangling += 1;
                SpriteRef::BLANK
            };
        }
    }
    copy
}
