use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use forge_codec::{encode_sprite_file, normalize_pixels, FieldTable, SpriteFile};
use forge_crypto::{ContentHash, ContentHasher};
use forge_types::{
    ClientVersion, FormatFeatures, NoProgress, ProgressKind, ProgressSink, Reporter, SpriteId,
    SpriteRef, SPRITE_DATA_SIZE,
};
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::error::{StoreError, StoreResult};
use crate::file::{map_file, write_atomic};
use crate::sprite::{alert_pixels, Sprite};

/// Reserved id of the alert sprite. Never allocated, never persisted.
pub const ALERT_SPRITE_ID: SpriteId = u32::MAX;

const MAGENTA: [u8; 4] = [0xFF, 0x00, 0xFF, 0xFF];

/// Pixels returned for a possibly dangling id.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedPixels<'a> {
    pub pixels: &'a [u8],
    /// The id did not resolve and the alert sprite was substituted.
    pub missing: bool,
}

/// Outcome of [`SpriteStore::remove_sprites`].
#[derive(Clone, Debug, Default)]
pub struct RemovedSprites {
    /// Removed sprites under their pre-removal ids, ascending.
    pub removed: Vec<(SpriteId, Sprite)>,
    /// Old id to new id for every surviving sprite whose id changed.
    pub remap: BTreeMap<SpriteId, SpriteId>,
}

impl RemovedSprites {
    pub fn is_removed(&self, id: SpriteId) -> bool {
        self.removed.binary_search_by_key(&id, |(i, _)| *i).is_ok()
    }

    /// Translate a reference taken before the removal. References to removed
    /// sprites become blank.
    pub fn apply(&self, sprite: SpriteRef) -> SpriteRef {
        match sprite.sprite_id() {
            Some(id) if self.is_removed(id) => SpriteRef::BLANK,
            Some(id) => self
                .remap
                .get(&id)
                .map_or(sprite, |new| SpriteRef::Resolved(*new)),
            None => sprite,
        }
    }
}

/// All sprites of one sprite file.
///
/// Sprite `n` lives at index `n - 1`; id 0 is the implicit blank sprite and
/// [`ALERT_SPRITE_ID`] the implicit alert sprite.
#[derive(Clone, Debug)]
pub struct SpriteStore {
    version: ClientVersion,
    features: FormatFeatures,
    signature: u32,
    sprites: Vec<Sprite>,
    blank: Sprite,
    alert: Sprite,
    changed: bool,
}

impl SpriteStore {
    /// An empty store for `version`.
    pub fn create_new(version: &ClientVersion, features: FormatFeatures) -> Self {
        let features = features.normalized(version.value);
        info!(version = version.value, "created sprite store");
        Self {
            version: version.clone(),
            features,
            signature: version.spr_signature,
            sprites: Vec::new(),
            blank: Sprite::blank(),
            alert: Sprite::from_pixels(alert_pixels()),
            changed: false,
        }
    }

    pub fn load(path: &Path, version: &ClientVersion, features: FormatFeatures) -> StoreResult<Self> {
        Self::load_with_progress(path, version, features, usize::MAX, &mut NoProgress)
    }

    /// Decode a sprite file, reporting once per `chunk` sprites.
    pub fn load_with_progress(
        path: &Path,
        version: &ClientVersion,
        features: FormatFeatures,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<Self> {
        let map = map_file(path)?;
        let store = Self::from_bytes(&map, version, features, chunk, sink)?;
        info!(
            path = %path.display(),
            version = version.value,
            sprites = store.sprites_count(),
            "loaded sprite store"
        );
        Ok(store)
    }

    pub fn from_bytes(
        data: &[u8],
        version: &ClientVersion,
        features: FormatFeatures,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<Self> {
        let mut store = Self::create_new(version, features);
        let table = store.field_table();
        let file = SpriteFile::decode(data, &table)?;
        let transparency = table.transparency();
        let mut reporter = Reporter::new(ProgressKind::Load, "sprites", file.len(), chunk);
        store.sprites.reserve(file.len());
        for record in &file.records {
            let sprite = match record {
                Some(payload) => {
                    let mut pixels = forge_codec::decode_pixels(payload, transparency)?;
                    normalize_pixels(&mut pixels, transparency);
                    Sprite::from_pixels(pixels)
                }
                None => store.blank.clone(),
            };
            store.sprites.push(sprite);
            reporter.advance(1, sink);
        }
        reporter.finish(sink);
        store.signature = file.signature;
        Ok(store)
    }

    /// Encode with the store's own version and features.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        self.encode(&self.field_table(), usize::MAX, &mut NoProgress)
    }

    fn encode(
        &self,
        table: &FieldTable,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<Vec<u8>> {
        let buffers: Vec<&[u8]> = self.sprites.iter().map(Sprite::pixels).collect();
        Ok(encode_sprite_file(&buffers, table, chunk, sink)?)
    }

    /// Validate and encode for another layout without touching the store.
    pub fn encode_for(
        &self,
        table: &FieldTable,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<Vec<u8>> {
        if self.sprites_count() > table.sprite_capacity() {
            return Err(StoreError::Capacity(format!(
                "{} sprites do not fit a {}-bit sprite file",
                self.sprites_count(),
                table.sprite_ids.bits()
            )));
        }
        self.encode(table, chunk, sink)
    }

    /// Adopt the layout of a file written from [`encode_for`](Self::encode_for).
    pub fn mark_compiled(&mut self, version: &ClientVersion, table: &FieldTable) {
        self.version = version.clone();
        self.features = table.features;
        self.signature = version.spr_signature;
        self.changed = false;
    }

    /// Encode for `version`/`features` and write atomically to `path`.
    /// On success the store adopts the written version.
    pub fn try_compile(
        &mut self,
        path: &Path,
        version: &ClientVersion,
        features: FormatFeatures,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<()> {
        let table = FieldTable::new(version, features);
        let bytes = self.encode_for(&table, chunk, sink)?;
        write_atomic(path, &bytes)?;
        self.mark_compiled(version, &table);
        info!(path = %path.display(), version = version.value, sprites = self.sprites_count(), "compiled sprite store");
        Ok(())
    }

    /// [`try_compile`](Self::try_compile) reporting failure as `false`.
    pub fn compile(&mut self, path: &Path, version: &ClientVersion, features: FormatFeatures) -> bool {
        match self.try_compile(path, version, features, usize::MAX, &mut NoProgress) {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "sprite compile failed");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn version(&self) -> &ClientVersion {
        &self.version
    }

    pub fn features(&self) -> FormatFeatures {
        self.features
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn field_table(&self) -> FieldTable {
        FieldTable::new(&self.version, self.features)
    }

    /// Highest assigned id.
    pub fn sprites_count(&self) -> SpriteId {
        self.sprites.len() as SpriteId
    }

    /// Highest id the current format can address.
    pub fn capacity(&self) -> SpriteId {
        self.field_table().sprite_capacity()
    }

    pub fn is_full(&self) -> bool {
        self.sprites_count() >= self.capacity()
    }

    pub fn has_sprite(&self, id: SpriteId) -> bool {
        id == 0 || (id as usize) <= self.sprites.len()
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        match id {
            0 => Some(&self.blank),
            ALERT_SPRITE_ID => Some(&self.alert),
            _ => self.sprites.get(id as usize - 1),
        }
    }

    /// Raw pixels of `id`, or `None` if unknown.
    pub fn get_pixels(&self, id: SpriteId) -> Option<&[u8]> {
        self.sprite(id).map(Sprite::pixels)
    }

    /// Pixels of `id`, substituting the alert sprite when it does not resolve.
    pub fn resolve_pixels(&self, id: SpriteId) -> ResolvedPixels<'_> {
        match self.sprite(id) {
            Some(sprite) => ResolvedPixels {
                pixels: sprite.pixels(),
                missing: false,
            },
            None => {
                warn!(sprite = id, count = self.sprites_count(), "dangling sprite reference");
                ResolvedPixels {
                    pixels: self.alert.pixels(),
                    missing: true,
                }
            }
        }
    }

    pub fn hash(&self, id: SpriteId) -> Option<ContentHash> {
        self.sprite(id).map(Sprite::hash)
    }

    /// Whether sprite `id` holds exactly `pixels`.
    pub fn compare(&self, id: SpriteId, pixels: &[u8]) -> bool {
        match self.sprite(id) {
            Some(sprite) => sprite.hash() == ContentHasher::sprite(&self.normalized(pixels)),
            None => false,
        }
    }

    /// Blank or unknown.
    pub fn is_empty(&self, id: SpriteId) -> bool {
        self.sprite(id).map_or(true, Sprite::is_blank)
    }

    /// `(id, sprite)` for every assigned id, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (SpriteId, &Sprite)> {
        self.sprites
            .iter()
            .enumerate()
            .map(|(i, s)| (i as SpriteId + 1, s))
    }

    /// A 32x32 image of `id`. Transparent pixels show magenta unless
    /// `transparent_bg` is set. Unknown ids render the alert sprite.
    pub fn get_bitmap(&self, id: SpriteId, transparent_bg: bool) -> Canvas {
        let size = forge_types::SPRITE_SIZE as u32;
        let mut canvas = if transparent_bg {
            Canvas::new(size, size)
        } else {
            Canvas::filled(size, size, MAGENTA)
        };
        canvas.draw_sprite(self.resolve_pixels(id).pixels, 0, 0);
        canvas
    }

    /// Draw `id` onto `canvas` at `(x, y)`.
    pub fn copy_pixels(&self, id: SpriteId, canvas: &mut Canvas, x: i32, y: i32) {
        canvas.draw_sprite(self.resolve_pixels(id).pixels, x, y);
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn normalized(&self, pixels: &[u8]) -> Vec<u8> {
        let mut px = pixels.to_vec();
        normalize_pixels(&mut px, self.features.transparency);
        px
    }

    fn checked(&self, pixels: Vec<u8>) -> StoreResult<Sprite> {
        if pixels.len() != SPRITE_DATA_SIZE {
            return Err(StoreError::Validation(format!(
                "sprite buffer has {} bytes, expected {SPRITE_DATA_SIZE}",
                pixels.len()
            )));
        }
        let mut pixels = pixels;
        normalize_pixels(&mut pixels, self.features.transparency);
        Ok(Sprite::from_pixels(pixels))
    }

    pub fn add_sprite(&mut self, pixels: Vec<u8>) -> StoreResult<SpriteId> {
        let ids = self.add_sprites(vec![pixels])?;
        Ok(ids[0])
    }

    /// Append sprites in order at `sprites_count + 1 ...`. All or nothing.
    pub fn add_sprites(&mut self, list: Vec<Vec<u8>>) -> StoreResult<Vec<SpriteId>> {
        let room = self.capacity().saturating_sub(self.sprites_count()) as usize;
        if list.len() > room {
            return Err(StoreError::Capacity(format!(
                "adding {} sprites to {} exceeds {}",
                list.len(),
                self.sprites_count(),
                self.capacity()
            )));
        }
        let sprites = list
            .into_iter()
            .map(|px| self.checked(px))
            .collect::<StoreResult<Vec<_>>>()?;
        let first = self.sprites_count() + 1;
        let ids: Vec<SpriteId> = (first..first + sprites.len() as SpriteId).collect();
        self.sprites.extend(sprites);
        if !ids.is_empty() {
            self.changed = true;
            debug!(first, count = ids.len(), "added sprites");
        }
        Ok(ids)
    }

    pub fn replace_sprite(&mut self, id: SpriteId, pixels: Vec<u8>) -> StoreResult<()> {
        self.replace_sprites(vec![(id, pixels)])
    }

    /// Overwrite sprites by id. Ids past the end extend the store, filling
    /// any gap with blank sprites; no id may lie beyond
    /// `sprites_count + list.len()`. All or nothing.
    pub fn replace_sprites(&mut self, list: Vec<(SpriteId, Vec<u8>)>) -> StoreResult<()> {
        let capacity = self.capacity();
        let reach = self
            .sprites_count()
            .saturating_add(SpriteId::try_from(list.len()).unwrap_or(SpriteId::MAX));
        let mut staged = Vec::with_capacity(list.len());
        for (id, pixels) in list {
            if id == 0 || id == ALERT_SPRITE_ID {
                return Err(StoreError::Validation(format!("sprite id {id} is reserved")));
            }
            if id > capacity {
                return Err(StoreError::Capacity(format!(
                    "sprite id {id} exceeds the format limit {capacity}"
                )));
            }
            if id > reach {
                return Err(StoreError::Capacity(format!(
                    "sprite id {id} is past the end of {} sprites",
                    self.sprites_count()
                )));
            }
            staged.push((id, self.checked(pixels)?));
        }
        let Some(top) = staged.iter().map(|(id, _)| *id).max() else {
            return Ok(());
        };
        if top as usize > self.sprites.len() {
            debug!(from = self.sprites_count(), to = top, "extending sprite store");
            self.sprites.resize(top as usize, self.blank.clone());
        }
        for (id, sprite) in staged {
            self.sprites[id as usize - 1] = sprite;
        }
        self.changed = true;
        Ok(())
    }

    /// Remove sprites and renumber the survivors densely from 1.
    pub fn remove_sprites(&mut self, ids: &[SpriteId]) -> StoreResult<RemovedSprites> {
        let mut doomed = BTreeSet::new();
        for &id in ids {
            if id == 0 || id == ALERT_SPRITE_ID {
                return Err(StoreError::Validation(format!("sprite id {id} is reserved")));
            }
            if id as usize > self.sprites.len() {
                return Err(StoreError::SpriteNotFound(id));
            }
            doomed.insert(id);
        }
        let mut result = RemovedSprites::default();
        if doomed.is_empty() {
            return Ok(result);
        }

        let old = std::mem::take(&mut self.sprites);
        for (i, sprite) in old.into_iter().enumerate() {
            let id = i as SpriteId + 1;
            if doomed.contains(&id) {
                result.removed.push((id, sprite));
            } else {
                let new_id = self.sprites.len() as SpriteId + 1;
                if new_id != id {
                    result.remap.insert(id, new_id);
                }
                self.sprites.push(sprite);
            }
        }
        self.changed = true;
        debug!(
            removed = result.removed.len(),
            renumbered = result.remap.len(),
            "removed sprites"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_types::{pixels::blank_pixels, VersionTable};

    fn version(value: u32) -> ClientVersion {
        VersionTable::builtin().require(value).unwrap().clone()
    }

    fn store() -> SpriteStore {
        SpriteStore::create_new(&version(1098), FormatFeatures::default())
    }

    fn solid(rgb: [u8; 3]) -> Vec<u8> {
        [rgb[0], rgb[1], rgb[2], 255]
            .iter()
            .copied()
            .cycle()
            .take(SPRITE_DATA_SIZE)
            .collect()
    }

    #[test]
    fn add_never_dedups() {
        let mut s = store();
        let a = solid([1, 2, 3]);
        let b = solid([4, 5, 6]);
        assert_eq!(s.add_sprite(a.clone()).unwrap(), 1);
        assert_eq!(s.add_sprite(a.clone()).unwrap(), 2);
        assert!(s.compare(1, &a));
        assert!(s.compare(2, &a));
        assert!(!s.compare(2, &b));
        assert!(!s.compare(3, &a));
        assert!(s.is_changed());
    }

    #[test]
    fn reserved_ids() {
        let s = store();
        assert_eq!(s.get_pixels(0).unwrap(), &blank_pixels()[..]);
        assert!(s.is_empty(0));
        assert!(s.get_pixels(1).is_none());
        assert!(s.get_pixels(ALERT_SPRITE_ID).is_some());
        assert!(!s.has_sprite(1));
    }

    #[test]
    fn replace_rejects_reserved_and_extends() {
        let mut s = store();
        assert!(matches!(
            s.replace_sprite(0, solid([1, 1, 1])),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            s.replace_sprite(ALERT_SPRITE_ID, solid([1, 1, 1])),
            Err(StoreError::Validation(_))
        ));
        s.replace_sprites(vec![(3, solid([7, 7, 7])), (1, solid([6, 6, 6]))])
            .unwrap();
        assert_eq!(s.sprites_count(), 3);
        assert!(s.is_empty(2));
        assert!(s.compare(3, &solid([7, 7, 7])));
    }

    #[test]
    fn replace_refuses_to_leap_past_the_end() {
        let mut s = SpriteStore::create_new(&version(1098), FormatFeatures::default().with_extended(true));
        s.add_sprite(solid([1, 1, 1])).unwrap();
        assert!(s.capacity() > 0xFFFF_FFF0);
        assert!(matches!(
            s.replace_sprite(0xFFFF_FFF0, solid([2, 2, 2])),
            Err(StoreError::Capacity(_))
        ));
        assert!(matches!(
            s.replace_sprite(3, solid([2, 2, 2])),
            Err(StoreError::Capacity(_))
        ));
        assert_eq!(s.sprites_count(), 1);
        s.replace_sprite(2, solid([2, 2, 2])).unwrap();
        assert_eq!(s.sprites_count(), 2);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut s = store();
        s.add_sprite(solid([1, 1, 1])).unwrap();
        let err = s.add_sprites(vec![solid([2, 2, 2]), vec![0u8; 10]]).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(s.sprites_count(), 1);

        let err = s
            .replace_sprites(vec![(1, solid([3, 3, 3])), (0, solid([3, 3, 3]))])
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(s.compare(1, &solid([1, 1, 1])));
    }

    #[test]
    fn narrow_store_fills_up() {
        let mut s = SpriteStore::create_new(&version(860), FormatFeatures::default());
        assert_eq!(s.capacity(), 0xFFFF);
        s.sprites.resize(0xFFFE, s.blank.clone());
        s.replace_sprite(0xFFFF, solid([1, 1, 1])).unwrap();
        assert!(s.is_full());
        let err = s.add_sprite(solid([1, 1, 1])).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Capacity);
        assert!(matches!(
            s.replace_sprite(0x1_0000, solid([1, 1, 1])),
            Err(StoreError::Capacity(_))
        ));
    }

    #[test]
    fn remove_compacts_and_remaps() {
        let mut s = store();
        for i in 1..=5u8 {
            s.add_sprite(solid([i, i, i])).unwrap();
        }
        let removed = s.remove_sprites(&[2, 4]).unwrap();
        assert_eq!(s.sprites_count(), 3);
        assert_eq!(
            removed.removed.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert_eq!(removed.remap.get(&3), Some(&2));
        assert_eq!(removed.remap.get(&5), Some(&3));
        assert!(!removed.remap.contains_key(&1));
        assert!(s.compare(3, &solid([5, 5, 5])));

        assert_eq!(removed.apply(SpriteRef::Resolved(4)), SpriteRef::BLANK);
        assert_eq!(removed.apply(SpriteRef::Resolved(5)), SpriteRef::Resolved(3));
        assert_eq!(removed.apply(SpriteRef::Resolved(1)), SpriteRef::Resolved(1));
    }

    #[test]
    fn remove_unknown_leaves_store() {
        let mut s = store();
        s.add_sprite(solid([1, 1, 1])).unwrap();
        assert!(matches!(
            s.remove_sprites(&[1, 9]),
            Err(StoreError::SpriteNotFound(9))
        ));
        assert_eq!(s.sprites_count(), 1);
    }

    #[test]
    fn dangling_reads_use_alert() {
        let s = store();
        let resolved = s.resolve_pixels(42);
        assert!(resolved.missing);
        assert_eq!(resolved.pixels, &alert_pixels()[..]);
        let bitmap = s.get_bitmap(42, true);
        assert_eq!(bitmap.pixel(0, 0), Some([0xFF, 0, 0, 0xFF]));
    }

    #[test]
    fn bitmap_background() {
        let s = store();
        let bitmap = s.get_bitmap(0, false);
        assert_eq!(bitmap.pixel(10, 10), Some(MAGENTA));
        let bitmap = s.get_bitmap(0, true);
        assert_eq!(bitmap.pixel(10, 10), Some([0, 0, 0, 0]));
    }

    #[test]
    fn compare_normalizes_input() {
        let mut s = store();
        let mut px = solid([9, 9, 9]);
        px[3] = 200;
        s.add_sprite(px.clone()).unwrap();
        // opaque format stores every visible pixel at full alpha
        assert!(s.compare(1, &px));
        assert_eq!(s.get_pixels(1).unwrap()[3], 255);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Tibia.spr");
        let v = version(1098);
        let mut s = store();
        s.add_sprites(vec![solid([1, 2, 3]), blank_pixels(), solid([4, 5, 6])])
            .unwrap();
        assert!(s.compile(&path, &v, FormatFeatures::default()));
        assert!(!s.is_changed());

        let mut events: Vec<forge_types::ProgressEvent> = Vec::new();
        let loaded =
            SpriteStore::load_with_progress(&path, &v, FormatFeatures::default(), 2, &mut events)
                .unwrap();
        assert_eq!(loaded.sprites_count(), 3);
        for id in 1..=3 {
            assert_eq!(loaded.get_pixels(id), s.get_pixels(id));
        }
        assert_eq!(events.last().map(|e| e.loaded), Some(3));
    }

    #[test]
    fn compile_failure_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("Tibia.spr");
        let mut s = store();
        s.add_sprite(solid([1, 1, 1])).unwrap();
        assert!(!s.compile(&path, &version(1098), FormatFeatures::default()));
        assert!(s.is_changed());
    }

    #[test]
    fn load_with_wrong_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Tibia.spr");
        let mut s = store();
        assert!(s.compile(&path, &version(1098), FormatFeatures::default()));
        let err = SpriteStore::load(&path, &version(860), FormatFeatures::default()).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Format);
    }
}
