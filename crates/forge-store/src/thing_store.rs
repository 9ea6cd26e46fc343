use std::collections::BTreeSet;
use std::path::Path;

use forge_codec::{decode_metadata, encode_metadata, FieldTable, MetadataFile};
use forge_types::{
    ClientVersion, FormatFeatures, FrameGroupType, NoProgress, ProgressSink, PropertyFilter,
    SpriteRef, Thing, ThingCategory, ThingId,
};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::file::{map_file, write_atomic};

/// All thing definitions of one metadata file.
///
/// Each category is a dense list: the thing at index `i` has id
/// `category.min_id() + i`. Every mutation validates its whole input before
/// touching the lists.
#[derive(Clone, Debug)]
pub struct ThingStore {
    version: ClientVersion,
    features: FormatFeatures,
    signature: u32,
    things: [Vec<Thing>; 4],
    /// Category still holds only the placeholder seeded by `create_new`.
    seeded: [bool; 4],
    changed: bool,
}

impl ThingStore {
    /// A store holding one blank placeholder per category at its first id.
    pub fn create_new(version: &ClientVersion, features: FormatFeatures) -> Self {
        let features = features.normalized(version.value);
        info!(version = version.value, ?features, "created thing store");
        Self {
            version: version.clone(),
            features,
            signature: version.dat_signature,
            things: ThingCategory::ALL.map(|c| vec![Thing::placeholder(c)]),
            seeded: [true; 4],
            changed: false,
        }
    }

    pub fn load(path: &Path, version: &ClientVersion, features: FormatFeatures) -> StoreResult<Self> {
        Self::load_with_progress(path, version, features, usize::MAX, &mut NoProgress)
    }

    /// Decode a metadata file, reporting once per `chunk` things.
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
            items = store.count(ThingCategory::Item),
            outfits = store.count(ThingCategory::Outfit),
            effects = store.count(ThingCategory::Effect),
            missiles = store.count(ThingCategory::Missile),
            "loaded thing store"
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
        let table = FieldTable::new(version, features);
        let file = decode_metadata(data, &table, chunk, sink)?;
        Ok(Self {
            version: version.clone(),
            features: table.features,
            signature: file.signature,
            things: file.things,
            seeded: [false; 4],
            changed: false,
        })
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
        let file = MetadataFile {
            signature: table.dat_signature,
            things: self.things.clone(),
        };
        Ok(encode_metadata(&file, table, chunk, sink)?)
    }

    /// Validate and encode for another layout without touching the store.
    pub fn encode_for(
        &self,
        table: &FieldTable,
        chunk: usize,
        sink: &mut dyn ProgressSink,
    ) -> StoreResult<Vec<u8>> {
        self.encode(table, chunk, sink)
    }

    /// Adopt the layout of a file written from [`encode_for`](Self::encode_for).
    pub fn mark_compiled(&mut self, version: &ClientVersion, table: &FieldTable) {
        self.version = version.clone();
        self.features = table.features;
        self.signature = version.dat_signature;
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
        info!(path = %path.display(), version = version.value, "compiled thing store");
        Ok(())
    }

    /// [`try_compile`](Self::try_compile) reporting failure as `false`.
    pub fn compile(&mut self, path: &Path, version: &ClientVersion, features: FormatFeatures) -> bool {
        match self.try_compile(path, version, features, usize::MAX, &mut NoProgress) {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "thing compile failed");
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

    pub fn min_id(&self, category: ThingCategory) -> ThingId {
        category.min_id()
    }

    /// Highest id in use; `min_id - 1` for an empty category.
    pub fn max_id(&self, category: ThingCategory) -> ThingId {
        category.min_id() + self.things[category.index()].len() as ThingId - 1
    }

    pub fn count(&self, category: ThingCategory) -> usize {
        self.things[category.index()].len()
    }

    pub fn things(&self, category: ThingCategory) -> &[Thing] {
        &self.things[category.index()]
    }

    /// Every thing, category by category in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Thing> {
        self.things.iter().flatten()
    }

    fn index_of(&self, id: ThingId, category: ThingCategory) -> Option<usize> {
        let index = id.checked_sub(category.min_id())? as usize;
        (index < self.things[category.index()].len()).then_some(index)
    }

    pub fn thing(&self, id: ThingId, category: ThingCategory) -> Option<&Thing> {
        self.index_of(id, category)
            .map(|i| &self.things[category.index()][i])
    }

    /// The thing at `id`, failing on an unknown id.
    pub fn get_thing(&self, id: ThingId, category: ThingCategory) -> StoreResult<&Thing> {
        self.thing(id, category)
            .ok_or(StoreError::ThingNotFound { category, id })
    }

    pub fn has_thing(&self, id: ThingId, category: ThingCategory) -> bool {
        self.index_of(id, category).is_some()
    }

    /// Every thing of `category` matching all `filters`.
    pub fn find_things(&self, category: ThingCategory, filters: &[PropertyFilter]) -> Vec<&Thing> {
        self.things(category)
            .iter()
            .filter(|t| t.matches(filters))
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn validate(&self, thing: &Thing) -> StoreResult<()> {
        let reject = |reason: String| {
            Err(StoreError::Validation(format!(
                "{} {}: {reason}",
                thing.category, thing.id
            )))
        };
        if thing.has_pending_sprites() {
            return reject("sprite table has unresolved entries".into());
        }
        if !thing.is_consistent() {
            return reject("frame group dimensions disagree with the sprite table".into());
        }
        let kinds: Vec<FrameGroupType> = thing.groups.keys().copied().collect();
        let split_allowed = thing.category == ThingCategory::Outfit && self.features.frame_groups;
        let ok = kinds == [FrameGroupType::Default]
            || (split_allowed && kinds == [FrameGroupType::Idle, FrameGroupType::Walking]);
        if !ok {
            return reject(format!("frame groups {kinds:?} are not valid for this format"));
        }
        Ok(())
    }

    pub fn add_thing(&mut self, thing: Thing) -> StoreResult<ThingId> {
        let ids = self.add_things(vec![thing])?;
        Ok(ids[0])
    }

    /// Append things at `max_id + 1 ...` of their categories, in order.
    /// The first thing added to a freshly created category takes the
    /// placeholder's id. All or nothing.
    pub fn add_things(&mut self, things: Vec<Thing>) -> StoreResult<Vec<ThingId>> {
        self.insert_things(things, true)
    }

    /// Like [`add_things`](Self::add_things) but always after the current
    /// max id, keeping a seeded placeholder.
    pub fn append_things(&mut self, things: Vec<Thing>) -> StoreResult<Vec<ThingId>> {
        self.insert_things(things, false)
    }

    fn insert_things(
        &mut self,
        things: Vec<Thing>,
        reuse_placeholder: bool,
    ) -> StoreResult<Vec<ThingId>> {
        let mut incoming = [0usize; 4];
        for thing in &things {
            self.validate(thing)?;
            incoming[thing.category.index()] += 1;
        }
        let mut seeded = self.seeded;
        if !reuse_placeholder {
            for (flag, n) in seeded.iter_mut().zip(incoming) {
                if n > 0 {
                    *flag = false;
                }
            }
        }
        for category in ThingCategory::ALL {
            let n = incoming[category.index()];
            if n == 0 {
                continue;
            }
            let base = if seeded[category.index()] { 0 } else { self.count(category) };
            let last = category.min_id() as u64 + (base + n) as u64 - 1;
            if last > category.max_id_capacity() as u64 {
                return Err(StoreError::Capacity(format!(
                    "{category} ids would reach {last}, limit is {}",
                    category.max_id_capacity()
                )));
            }
        }

        self.seeded = seeded;
        let mut ids = Vec::with_capacity(things.len());
        for mut thing in things {
            let slot = thing.category.index();
            if self.seeded[slot] {
                self.things[slot].clear();
                self.seeded[slot] = false;
            }
            thing.id = thing.category.min_id() + self.things[slot].len() as ThingId;
            ids.push(thing.id);
            self.things[slot].push(thing);
        }
        if !ids.is_empty() {
            self.changed = true;
            debug!(count = ids.len(), "added things");
        }
        Ok(ids)
    }

    pub fn replace_thing(&mut self, thing: Thing) -> StoreResult<()> {
        self.replace_things(vec![thing])
    }

    /// Overwrite things in place by `(category, id)`. All or nothing.
    pub fn replace_things(&mut self, things: Vec<Thing>) -> StoreResult<()> {
        let mut slots = Vec::with_capacity(things.len());
        for thing in &things {
            self.validate(thing)?;
            let index = self.index_of(thing.id, thing.category).ok_or(
                StoreError::ThingNotFound {
                    category: thing.category,
                    id: thing.id,
                },
            )?;
            slots.push(index);
        }
        for (thing, index) in things.into_iter().zip(slots) {
            let slot = thing.category.index();
            self.seeded[slot] = false;
            self.things[slot][index] = thing;
        }
        self.changed = true;
        Ok(())
    }

    /// Remove things and renumber the rest of the category downward so ids
    /// stay dense. Returns the removed things under their original ids.
    pub fn remove_things(
        &mut self,
        ids: &[ThingId],
        category: ThingCategory,
    ) -> StoreResult<Vec<Thing>> {
        let mut doomed = BTreeSet::new();
        for &id in ids {
            let index = self
                .index_of(id, category)
                .ok_or(StoreError::ThingNotFound { category, id })?;
            if !doomed.insert(index) {
                return Err(StoreError::Validation(format!(
                    "{category} {id} listed twice for removal"
                )));
            }
        }
        if doomed.is_empty() {
            return Ok(Vec::new());
        }

        let slot = category.index();
        let old = std::mem::take(&mut self.things[slot]);
        let mut removed = Vec::with_capacity(doomed.len());
        for (index, mut thing) in old.into_iter().enumerate() {
            if doomed.contains(&index) {
                removed.push(thing);
            } else {
                thing.id = category.min_id() + self.things[slot].len() as ThingId;
                self.things[slot].push(thing);
            }
        }
        self.seeded[slot] = false;
        self.changed = true;
        debug!(%category, removed = removed.len(), remaining = self.count(category), "removed things");
        Ok(removed)
    }

    /// Apply `f` to every thing of `category`. Ids and categories are kept
    /// whatever `f` does to them. Returns how many calls reported a change.
    pub fn edit_things<F>(&mut self, category: ThingCategory, mut f: F) -> usize
    where
        F: FnMut(&mut Thing) -> bool,
    {
        let mut edited = 0;
        for thing in &mut self.things[category.index()] {
            let (id, cat) = (thing.id, thing.category);
            if f(thing) {
                edited += 1;
            }
            thing.id = id;
            thing.category = cat;
        }
        if edited > 0 {
            self.seeded[category.index()] = false;
            self.changed = true;
        }
        edited
    }

    /// Rewrite every sprite reference through `f`. Returns the number of
    /// entries that changed.
    pub fn rewrite_sprite_refs<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(SpriteRef) -> SpriteRef,
    {
        let mut rewritten = 0;
        for thing in self.things.iter_mut().flatten() {
            for sprite in thing.sprite_refs_mut() {
                let next = f(*sprite);
                if next != *sprite {
                    *sprite = next;
                    rewritten += 1;
                }
            }
        }
        if rewritten > 0 {
            self.changed = true;
        }
        rewritten
    }

    /// Switch the in-memory frame group layout flag. Callers convert the
    /// outfits themselves.
    pub fn set_frame_groups(&mut self, on: bool) {
        if self.features.frame_groups != on {
            self.features.frame_groups = on;
            self.changed = true;
        }
    }
}
