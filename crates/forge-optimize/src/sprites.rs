use std::collections::HashMap;

use forge_crypto::{ContentHash, ContentHasher};
use forge_store::{SpriteStore, ThingStore};
use forge_types::{pixels, ProgressKind, ProgressSink, Reporter, SpriteId, SpriteRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::OptimizeResult;

/// Which sprites the pass may drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteOptions {
    /// Drop sprites no thing references.
    pub remove_unused: bool,
    /// Redirect references of identical sprites to the lowest id and drop
    /// the copies. Blank sprites redirect to id 0.
    pub merge_duplicates: bool,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        Self {
            remove_unused: true,
            merge_duplicates: true,
        }
    }
}

/// Outcome of a sprite optimization pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteReport {
    pub old_count: SpriteId,
    pub new_count: SpriteId,
    pub removed_count: usize,
    /// Removed because an earlier sprite holds the same pixels.
    pub duplicates: usize,
    /// Removed because nothing referenced them.
    pub unused: usize,
    pub references_rewritten: usize,
    /// References past the sprite count, rewritten to blank.
    pub dangling_refs: usize,
}

/// Deduplicates and compacts a sprite store against the things using it.
pub struct SpriteOptimizer<'a> {
    options: SpriteOptions,
    chunk: usize,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> SpriteOptimizer<'a> {
    pub fn new(options: SpriteOptions, chunk: usize, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            options,
            chunk: chunk.max(1),
            sink,
        }
    }

    /// Run the pass. Either every marked sprite is removed and every
    /// reference rewritten, or nothing changes.
    pub fn run(
        &mut self,
        things: &mut ThingStore,
        sprites: &mut SpriteStore,
    ) -> OptimizeResult<SpriteReport> {
        let count = sprites.sprites_count();
        let mut report = SpriteReport {
            old_count: count,
            ..SpriteReport::default()
        };

        // 1. hash
        let mut reporter = Reporter::new(ProgressKind::OptimizeSprites, "hashing", count as usize, self.chunk);
        let mut hashes: Vec<ContentHash> = Vec::with_capacity(count as usize + 1);
        hashes.push(ContentHasher::sprite(&pixels::blank_pixels()));
        for (i, (_, sprite)) in sprites.iter().enumerate() {
            hashes.push(sprite.hash());
            if (i + 1) % self.chunk == 0 {
                reporter.advance(self.chunk, self.sink);
            }
        }
        reporter.finish(self.sink);

        // 2. usage
        let mut used = vec![false; count as usize + 1];
        let total_things = things.iter().count();
        reporter.restart("scanning", total_things);
        for (i, thing) in things.iter().enumerate() {
            for id in thing.sprite_ids() {
                match used.get_mut(id as usize) {
                    Some(slot) => *slot = true,
                    None => report.dangling_refs += 1,
                }
            }
            if (i + 1) % self.chunk == 0 {
                reporter.advance(self.chunk, self.sink);
            }
        }
        reporter.finish(self.sink);
        if report.dangling_refs > 0 {
            warn!(count = report.dangling_refs, "blanking references past the sprite count");
        }

        // 3. mark
        let mut canonical: Vec<SpriteId> = (0..=count).collect();
        if self.options.merge_duplicates {
            let mut first: HashMap<ContentHash, SpriteId> = HashMap::with_capacity(hashes.len());
            for (id, hash) in hashes.iter().enumerate() {
                canonical[id] = *first.entry(*hash).or_insert(id as SpriteId);
            }
        }
        let mut live = vec![false; count as usize + 1];
        live[0] = true;
        for id in 1..=count as usize {
            if used[id] {
                live[canonical[id] as usize] = true;
            }
        }
        let mut doomed = Vec::new();
        for id in 1..=count {
            let i = id as usize;
            if canonical[i] != id {
                report.duplicates += 1;
                doomed.push(id);
            } else if self.options.remove_unused && !live[i] {
                report.unused += 1;
                doomed.push(id);
            }
        }
        debug!(duplicates = report.duplicates, unused = report.unused, "marked sprites");

        // 4. remove and rewrite as one step
        reporter.restart("compacting", doomed.len());
        let removed = sprites.remove_sprites(&doomed)?;
        report.references_rewritten = things.rewrite_sprite_refs(|sprite| match sprite.sprite_id() {
            Some(id) if id <= count => removed.apply(SpriteRef::Resolved(canonical[id as usize])),
            Some(_) => SpriteRef::BLANK,
            None => sprite,
        });
        reporter.finish(self.sink);

        report.removed_count = removed.removed.len();
        report.new_count = sprites.sprites_count();
        info!(
            old = report.old_count,
            new = report.new_count,
            removed = report.removed_count,
            rewritten = report.references_rewritten,
            "sprite optimization complete"
        );
        Ok(report)
    }
}
