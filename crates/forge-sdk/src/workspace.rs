use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use forge_codec::{read_signature, FieldTable};
use forge_convert::{ConversionReport, Direction, FrameGroupConverter};
use forge_crypto::ContentHasher;
use forge_merge::{MergeReport, Merger};
use forge_obd::{ObdCodec, ObdObject, ObdSprite, ObdVersion};
use forge_optimize::{
    DurationOptimizer, DurationReport, DurationSettings, SpriteOptimizer, SpriteReport,
};
use forge_store::file::write_all_atomic;
use forge_store::{RemovedSprites, SpriteStore, StoreError, ThingStore};
use forge_types::{
    ClientVersion, FormatFeatures, FrameGroupType, PropertyFilter, SpriteId, SpriteRef, Thing,
    ThingCategory, ThingId, VersionTable,
};
use tracing::{info, warn};

use crate::config::WorkspaceConfig;
use crate::error::{SdkError, SdkResult};
use crate::notify::{Change, Notification, Notifications};
use crate::otfi::OtfiFile;

/// A thing entry pointing at a sprite the sprite store does not hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceWarning {
    pub category: ThingCategory,
    pub thing: ThingId,
    pub group: FrameGroupType,
    /// Index into the group's sprite table.
    pub slot: usize,
    pub sprite: SpriteId,
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?}[{}] references missing sprite {}",
            self.category, self.thing, self.group, self.slot, self.sprite
        )
    }
}

/// Outcome of [`Workspace::remove_sprites`].
#[derive(Clone, Debug, Default)]
pub struct SpriteRemoval {
    pub removed: RemovedSprites,
    /// Thing entries blanked or renumbered.
    pub references_rewritten: usize,
}

#[derive(Clone, Debug)]
pub struct ObdExport {
    pub bytes: Vec<u8>,
    /// Entries that did not resolve and were exported as the alert sprite.
    pub warnings: Vec<ReferenceWarning>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObdImport {
    pub category: ThingCategory,
    pub id: ThingId,
    pub sprites_added: usize,
    /// Entries that reused an existing sprite with identical pixels.
    pub sprites_reused: usize,
}

struct Session {
    things: ThingStore,
    sprites: SpriteStore,
}

/// One loaded thing/sprite pair and everything a host does with it.
///
/// A workspace is either unloaded or owns exactly one [`ThingStore`] and one
/// [`SpriteStore`]. Every mutation goes through here so that sprite removal
/// can keep thing references valid, and every event is queued for the host
/// to poll with [`drain_notifications`](Self::drain_notifications).
pub struct Workspace {
    config: WorkspaceConfig,
    versions: VersionTable,
    session: Option<Session>,
    notifications: Notifications,
}

impl Workspace {
    /// A workspace using the version table the configuration selects.
    pub fn new(config: WorkspaceConfig) -> SdkResult<Self> {
        let versions = config.versions()?;
        Ok(Self::with_versions(config, versions))
    }

    pub fn with_versions(config: WorkspaceConfig, versions: VersionTable) -> Self {
        Self {
            config,
            versions,
            session: None,
            notifications: Notifications::default(),
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn versions(&self) -> &VersionTable {
        &self.versions
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Take every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    pub fn things(&self) -> SdkResult<&ThingStore> {
        self.session.as_ref().map(|s| &s.things).ok_or(SdkError::NotLoaded)
    }

    pub fn sprites(&self) -> SdkResult<&SpriteStore> {
        self.session.as_ref().map(|s| &s.sprites).ok_or(SdkError::NotLoaded)
    }

    fn session_mut(&mut self) -> SdkResult<&mut Session> {
        self.session.as_mut().ok_or(SdkError::NotLoaded)
    }

    fn client(&self, value: u32) -> SdkResult<ClientVersion> {
        Ok(self.versions.require(value)?.clone())
    }

    fn report<T>(&mut self, result: SdkResult<T>) -> SdkResult<T> {
        if let Err(e) = &result {
            self.notifications.push(Notification::Error(e.to_string()));
        }
        result
    }

    /// Queue one change per category touched.
    fn notify_things(&mut self, changes: Vec<(ThingCategory, ThingId)>) {
        for category in ThingCategory::ALL {
            let ids: Vec<ThingId> = changes
                .iter()
                .filter(|(c, _)| *c == category)
                .map(|(_, id)| *id)
                .collect();
            if !ids.is_empty() {
                self.notifications.push(Notification::Changed(Change::Things { category, ids }));
            }
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start an empty pair for `version`.
    pub fn create_new(&mut self, version: u32, features: FormatFeatures) -> SdkResult<()> {
        let client = self.client(version);
        let client = self.report(client)?;
        self.open(Session {
            things: ThingStore::create_new(&client, features),
            sprites: SpriteStore::create_new(&client, features),
        });
        Ok(())
    }

    /// Load a pair with explicit version and flags. On failure the
    /// workspace keeps whatever it had before.
    pub fn load(
        &mut self,
        dat: &Path,
        spr: &Path,
        version: u32,
        features: FormatFeatures,
    ) -> SdkResult<()> {
        let result = self.read_pair(dat, spr, version, features);
        let session = self.report(result)?;
        self.open(session);
        Ok(())
    }

    /// Load a pair, identifying the version by its file signatures and
    /// restoring flags from the `.otfi` sidecar when one exists.
    pub fn load_detected(&mut self, dat: &Path, spr: &Path) -> SdkResult<()> {
        let result = self.detect(dat, spr).and_then(|(version, features)| {
            self.read_pair(dat, spr, version, features)
        });
        let session = self.report(result)?;
        self.open(session);
        Ok(())
    }

    fn detect(&self, dat: &Path, spr: &Path) -> SdkResult<(u32, FormatFeatures)> {
        let dat_signature = read_signature(&read_head(dat)?)?;
        let spr_signature = read_signature(&read_head(spr)?)?;
        let client = self
            .versions
            .by_signatures(dat_signature, spr_signature)
            .ok_or(SdkError::UnknownSignatures {
                dat: dat_signature,
                spr: spr_signature,
            })?;
        let features = match OtfiFile::read(&OtfiFile::path_for(dat))? {
            Some(otfi) => otfi.features,
            None => FormatFeatures::for_version(client.value),
        };
        info!(version = client.value, ?features, "detected client version");
        Ok((client.value, features))
    }

    fn read_pair(
        &mut self,
        dat: &Path,
        spr: &Path,
        version: u32,
        features: FormatFeatures,
    ) -> SdkResult<Session> {
        let client = self.client(version)?;
        let chunk = self.config.progress_chunk;
        let things = ThingStore::load_with_progress(dat, &client, features, chunk, &mut self.notifications)?;
        let sprites = SpriteStore::load_with_progress(spr, &client, features, chunk, &mut self.notifications)?;
        Ok(Session { things, sprites })
    }

    fn open(&mut self, session: Session) {
        let things = ThingCategory::ALL.iter().map(|c| session.things.count(*c)).sum();
        self.notifications.push(Notification::Loaded {
            version: session.things.version().value,
            things,
            sprites: session.sprites.sprites_count(),
        });
        self.session = Some(session);
    }

    /// Write the pair and its sidecar with the current version and flags.
    pub fn compile(&mut self, dat: &Path, spr: &Path) -> bool {
        let Ok(things) = self.things() else {
            self.notifications.push(Notification::Error(SdkError::NotLoaded.to_string()));
            return false;
        };
        let (version, features) = (things.version().value, things.features());
        self.compile_as(dat, spr, version, features)
    }

    /// Write the pair and its sidecar for another version or flag set.
    /// Returns `false` and queues an error notification on failure.
    pub fn compile_as(
        &mut self,
        dat: &Path,
        spr: &Path,
        version: u32,
        features: FormatFeatures,
    ) -> bool {
        let result = self.try_compile(dat, spr, version, features);
        match self.report(result) {
            Ok(()) => {
                self.notifications.push(Notification::Compiled {
                    metadata: dat.to_path_buf(),
                    sprites: spr.to_path_buf(),
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "compile failed");
                false
            }
        }
    }

    fn try_compile(
        &mut self,
        dat: &Path,
        spr: &Path,
        version: u32,
        features: FormatFeatures,
    ) -> SdkResult<()> {
        let client = self.client(version)?;
        let chunk = self.config.progress_chunk;
        let table = FieldTable::new(&client, features);
        let session = self.session.as_mut().ok_or(SdkError::NotLoaded)?;
        let sprite_bytes = session
            .sprites
            .encode_for(&table, chunk, &mut self.notifications)?;
        let thing_bytes = session
            .things
            .encode_for(&table, chunk, &mut self.notifications)?;

        let mut otfi = OtfiFile::new(table.features);
        otfi.metadata_file = file_name(dat);
        otfi.sprites_file = file_name(spr);
        let otfi_path = OtfiFile::path_for(dat);
        let otfi_text = otfi.to_string();

        write_all_atomic(&[
            (spr, &sprite_bytes[..]),
            (dat, &thing_bytes[..]),
            (otfi_path.as_path(), otfi_text.as_bytes()),
        ])?;
        session.sprites.mark_compiled(&client, &table);
        session.things.mark_compiled(&client, &table);
        info!(
            metadata = %dat.display(),
            sprites = %spr.display(),
            version = client.value,
            "compiled workspace"
        );
        Ok(())
    }

    pub fn unload(&mut self) {
        if self.session.take().is_some() {
            info!("unloaded workspace");
            self.notifications.push(Notification::Unloaded);
        }
    }

    // ------------------------------------------------------------------
    // Things
    // ------------------------------------------------------------------

    /// A copy of a stored thing, safe to edit.
    pub fn get_thing(&self, id: ThingId, category: ThingCategory) -> SdkResult<Thing> {
        Ok(self.things()?.get_thing(id, category)?.clone())
    }

    pub fn find_things(&self, category: ThingCategory, filters: &[PropertyFilter]) -> SdkResult<Vec<Thing>> {
        Ok(self
            .things()?
            .find_things(category, filters)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn add_thing(&mut self, thing: Thing) -> SdkResult<ThingId> {
        let ids = self.add_things(vec![thing])?;
        Ok(ids[0])
    }

    pub fn add_things(&mut self, things: Vec<Thing>) -> SdkResult<Vec<ThingId>> {
        let categories: Vec<ThingCategory> = things.iter().map(|t| t.category).collect();
        let result = self
            .session_mut()
            .and_then(|s| Ok(s.things.add_things(things)?));
        let ids = self.report(result)?;
        self.notify_things(categories.into_iter().zip(ids.iter().copied()).collect());
        Ok(ids)
    }

    pub fn replace_thing(&mut self, thing: Thing) -> SdkResult<()> {
        self.replace_things(vec![thing])
    }

    pub fn replace_things(&mut self, things: Vec<Thing>) -> SdkResult<()> {
        let changes = things.iter().map(|t| (t.category, t.id)).collect();
        let result = self
            .session_mut()
            .and_then(|s| Ok(s.things.replace_things(things)?));
        self.report(result)?;
        self.notify_things(changes);
        Ok(())
    }

    /// Remove things and compact the category. Sprites they used stay.
    pub fn remove_things(&mut self, ids: &[ThingId], category: ThingCategory) -> SdkResult<Vec<Thing>> {
        let result = self
            .session_mut()
            .and_then(|s| Ok(s.things.remove_things(ids, category)?));
        let removed = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::Things {
            category,
            ids: ids.to_vec(),
        }));
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Sprites
    // ------------------------------------------------------------------

    pub fn add_sprites(&mut self, list: Vec<Vec<u8>>) -> SdkResult<Vec<SpriteId>> {
        let result = self
            .session_mut()
            .and_then(|s| Ok(s.sprites.add_sprites(list)?));
        let ids = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::Sprites { ids: ids.clone() }));
        Ok(ids)
    }

    pub fn replace_sprites(&mut self, list: Vec<(SpriteId, Vec<u8>)>) -> SdkResult<()> {
        let ids = list.iter().map(|(id, _)| *id).collect();
        let result = self
            .session_mut()
            .and_then(|s| Ok(s.sprites.replace_sprites(list)?));
        self.report(result)?;
        self.notifications.push(Notification::Changed(Change::Sprites { ids }));
        Ok(())
    }

    /// Remove sprites and renumber the rest, rewriting every thing
    /// reference. Without `cascade` the call fails if any thing still uses
    /// a removed sprite; with it those entries become blank.
    pub fn remove_sprites(&mut self, ids: &[SpriteId], cascade: bool) -> SdkResult<SpriteRemoval> {
        let result = self.session_mut().and_then(|s| s.remove_sprites(ids, cascade));
        let removal = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::All));
        Ok(removal)
    }

    /// [`remove_sprites`](Self::remove_sprites) with the configured cascade default.
    pub fn remove_sprites_default(&mut self, ids: &[SpriteId]) -> SdkResult<SpriteRemoval> {
        let cascade = self.config.cascade_sprite_removal;
        self.remove_sprites(ids, cascade)
    }

    /// Every thing entry whose sprite does not exist.
    pub fn verify_references(&self) -> SdkResult<Vec<ReferenceWarning>> {
        let things = self.things()?;
        let sprites = self.sprites()?;
        let mut warnings = Vec::new();
        for thing in things.iter() {
            warnings.extend(dangling(thing, sprites));
        }
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "dangling sprite references");
        }
        Ok(warnings)
    }

    // ------------------------------------------------------------------
    // Exchange
    // ------------------------------------------------------------------

    /// Export one thing with its pixels in the configured container version.
    pub fn export_obd(&self, id: ThingId, category: ThingCategory) -> SdkResult<ObdExport> {
        self.export_obd_as(id, category, self.config.obd_version)
    }

    pub fn export_obd_as(
        &self,
        id: ThingId,
        category: ThingCategory,
        version: ObdVersion,
    ) -> SdkResult<ObdExport> {
        let things = self.things()?;
        let sprites = self.sprites()?;
        let thing = things.get_thing(id, category)?.clone();
        let warnings = dangling(&thing, sprites);

        let mut entries = BTreeMap::new();
        for (kind, group) in &thing.groups {
            let list = group
                .sprites
                .iter()
                .map(|sprite| match sprite.sprite_id() {
                    Some(id) => ObdSprite::new(*sprite, sprites.resolve_pixels(id).pixels.to_vec()),
                    None => ObdSprite::blank(),
                })
                .collect();
            entries.insert(*kind, list);
        }
        let object = ObdObject {
            version,
            client_version: things.version().value,
            thing,
            sprites: entries,
        };
        let bytes = ObdCodec::encode(&object, things.version())?;
        info!(%category, id, %version, sprites = object.sprite_count(), "exported thing");
        Ok(ObdExport { bytes, warnings })
    }

    /// Import a container as a new thing. Sprites whose pixels already sit
    /// at their recorded id are reused; the rest are appended.
    pub fn import_obd(&mut self, bytes: &[u8]) -> SdkResult<ObdImport> {
        let result = ObdCodec::decode(bytes, &self.versions)
            .map_err(SdkError::from)
            .and_then(|object| self.session_mut()?.import(object));
        let import = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::Things {
            category: import.category,
            ids: vec![import.id],
        }));
        Ok(import)
    }

    // ------------------------------------------------------------------
    // Store-wide passes
    // ------------------------------------------------------------------

    /// Append another pair to this one.
    pub fn merge(
        &mut self,
        dat: &Path,
        spr: &Path,
        version: u32,
        features: FormatFeatures,
    ) -> SdkResult<MergeReport> {
        let result = self.client(version).and_then(|client| {
            let chunk = self.config.progress_chunk;
            let session = self.session.as_mut().ok_or(SdkError::NotLoaded)?;
            let mut merger = Merger::new(chunk, &mut self.notifications);
            Ok(merger.start(&mut session.things, &mut session.sprites, dat, spr, &client, features)?)
        });
        let report = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::All));
        Ok(report)
    }

    /// Deduplicate and compact the sprite store with the configured options.
    pub fn optimize_sprites(&mut self) -> SdkResult<SpriteReport> {
        let options = self.config.sprite_optimizer;
        let chunk = self.config.progress_chunk;
        let result = match self.session.as_mut() {
            Some(session) => SpriteOptimizer::new(options, chunk, &mut self.notifications)
                .run(&mut session.things, &mut session.sprites)
                .map_err(SdkError::from),
            None => Err(SdkError::NotLoaded),
        };
        let report = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::All));
        Ok(report)
    }

    pub fn optimize_durations(&mut self, settings: DurationSettings) -> SdkResult<DurationReport> {
        let chunk = self.config.progress_chunk;
        let result = match self.session.as_mut() {
            Some(session) => DurationOptimizer::new(settings, chunk, &mut self.notifications)
                .run(&mut session.things)
                .map_err(SdkError::from),
            None => Err(SdkError::NotLoaded),
        };
        let report = self.report(result)?;
        if report.total() > 0 {
            self.notifications.push(Notification::Changed(Change::All));
        }
        Ok(report)
    }

    pub fn convert_frame_groups(&mut self, direction: Direction) -> SdkResult<ConversionReport> {
        let options = self.config.frame_groups;
        let chunk = self.config.progress_chunk;
        let result = match self.session.as_mut() {
            Some(session) => FrameGroupConverter::new(options, chunk, &mut self.notifications)
                .run(&mut session.things, direction)
                .map_err(SdkError::from),
            None => Err(SdkError::NotLoaded),
        };
        let report = self.report(result)?;
        self.notifications.push(Notification::Changed(Change::All));
        Ok(report)
    }
}

impl Session {
    fn remove_sprites(&mut self, ids: &[SpriteId], cascade: bool) -> SdkResult<SpriteRemoval> {
        let doomed: BTreeSet<SpriteId> = ids.iter().copied().collect();
        if !cascade {
            for thing in self.things.iter() {
                if let Some(sprite) = thing.sprite_ids().find(|id| doomed.contains(id)) {
                    return Err(StoreError::StillReferenced {
                        sprite,
                        category: thing.category,
                        thing: thing.id,
                    }
                    .into());
                }
            }
        }
        let removed = self.sprites.remove_sprites(ids)?;
        let references_rewritten = self.things.rewrite_sprite_refs(|sprite| removed.apply(sprite));
        info!(
            removed = removed.removed.len(),
            renumbered = removed.remap.len(),
            rewritten = references_rewritten,
            "removed sprites"
        );
        Ok(SpriteRemoval {
            removed,
            references_rewritten,
        })
    }

    fn import(&mut self, object: ObdObject) -> SdkResult<ObdImport> {
        let mut thing = object.thing;
        let category = thing.category;
        let mut fresh: Vec<Vec<u8>> = Vec::new();
        let mut by_hash = HashMap::new();
        let mut reused = 0;
        let first_new = self.sprites.sprites_count() + 1;

        for (kind, group) in thing.groups.iter_mut() {
            let Some(entries) = object.sprites.get(kind) else {
                continue;
            };
            for (slot, entry) in group.sprites.iter_mut().zip(entries) {
                if !slot.is_pending() {
                    continue;
                }
                if let SpriteRef::Resolved(id) = entry.id {
                    if id != 0 && self.sprites.compare(id, &entry.pixels) {
                        *slot = SpriteRef::Resolved(id);
                        reused += 1;
                        continue;
                    }
                }
                let hash = ContentHasher::sprite(&entry.pixels);
                let id = *by_hash.entry(hash).or_insert_with(|| {
                    fresh.push(entry.pixels.clone());
                    first_new + fresh.len() as SpriteId - 1
                });
                *slot = SpriteRef::Resolved(id);
            }
        }

        // staged on a copy; pixel buffers are shared, not duplicated
        let mut sprites = self.sprites.clone();
        let added = sprites.add_sprites(fresh)?;
        let id = self.things.add_thing(thing)?;
        self.sprites = sprites;
        info!(%category, id, added = added.len(), reused, "imported thing");
        Ok(ObdImport {
            category,
            id,
            sprites_added: added.len(),
            sprites_reused: reused,
        })
    }
}

fn dangling(thing: &Thing, sprites: &SpriteStore) -> Vec<ReferenceWarning> {
    let mut warnings = Vec::new();
    for (kind, group) in &thing.groups {
        for (slot, sprite) in group.sprites.iter().enumerate() {
            if let Some(id) = sprite.sprite_id() {
                if !sprites.has_sprite(id) {
                    warnings.push(ReferenceWarning {
                        category: thing.category,
                        thing: thing.id,
                        group: *kind,
                        slot,
                        sprite: id,
                    });
                }
            }
        }
    }
    warnings
}

/// First bytes of a file, enough for its signature.
fn read_head(path: &Path) -> SdkResult<Vec<u8>> {
    use std::io::Read;
    let mut head = Vec::with_capacity(4);
    std::fs::File::open(path)?.take(4).read_to_end(&mut head)?;
    Ok(head)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_types::{ProgressKind, ThingProperty, SPRITE_DATA_SIZE};

    fn solid(v: u8) -> Vec<u8> {
        [v, 0, v, 255].iter().copied().cycle().take(SPRITE_DATA_SIZE).collect()
    }

    fn item(refs: &[u32]) -> Thing {
        let mut thing = Thing::new(0, ThingCategory::Item).with_property(ThingProperty::Pickupable);
        let group = thing.group_mut(FrameGroupType::Default).unwrap();
        group.pattern_x = refs.len() as u8;
        group.sprites = refs.iter().map(|id| SpriteRef::Resolved(*id)).collect();
        thing
    }

    fn workspace() -> Workspace {
        let mut ws = Workspace::new(WorkspaceConfig::default()).unwrap();
        ws.create_new(1098, FormatFeatures::default()).unwrap();
        ws.drain_notifications();
        ws
    }

    fn refs(ws: &Workspace, id: ThingId) -> Vec<SpriteRef> {
        ws.get_thing(id, ThingCategory::Item).unwrap().sprite_refs().copied().collect()
    }

    #[test]
    fn first_item_in_new_pair_takes_min_id() {
        let mut ws = Workspace::new(WorkspaceConfig::default()).unwrap();
        ws.create_new(1098, FormatFeatures::default().with_extended(true)).unwrap();
        let id = ws.add_thing(item(&[0])).unwrap();
        assert_eq!(id, 100);
        assert_eq!(ws.things().unwrap().max_id(ThingCategory::Item), 100);
    }

    #[test]
    fn unloaded_workspace_refuses_work() {
        let mut ws = Workspace::new(WorkspaceConfig::default()).unwrap();
        assert!(matches!(ws.things(), Err(SdkError::NotLoaded)));
        assert!(matches!(ws.add_thing(item(&[0])), Err(SdkError::NotLoaded)));
        let dir = tempfile::tempdir().unwrap();
        assert!(!ws.compile(&dir.path().join("a.dat"), &dir.path().join("a.spr")));
        assert!(ws
            .drain_notifications()
            .iter()
            .all(|n| matches!(n, Notification::Error(_))));
    }

    #[test]
    fn unknown_version_is_an_error() {
        let mut ws = Workspace::new(WorkspaceConfig::default()).unwrap();
        assert!(matches!(
            ws.create_new(1234, FormatFeatures::default()),
            Err(SdkError::Type(_))
        ));
        assert!(!ws.is_loaded());
    }

    #[test]
    fn compile_then_load_detected() {
        let dir = tempfile::tempdir().unwrap();
        let (dat, spr) = (dir.path().join("Tibia.dat"), dir.path().join("Tibia.spr"));
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2)]).unwrap();
        ws.add_thing(item(&[1, 2])).unwrap();
        assert!(ws.compile_as(&dat, &spr, 1098, FormatFeatures::default().with_transparency(true)));
        assert!(OtfiFile::path_for(&dat).exists());
        ws.unload();
        assert!(!ws.is_loaded());

        ws.load_detected(&dat, &spr).unwrap();
        let things = ws.things().unwrap();
        assert_eq!(things.version().value, 1098);
        assert!(things.features().transparency);
        assert_eq!(ws.sprites().unwrap().sprites_count(), 2);
        assert_eq!(refs(&ws, 100), vec![SpriteRef::Resolved(1), SpriteRef::Resolved(2)]);

        let notes = ws.drain_notifications();
        assert!(notes.iter().any(|n| matches!(n, Notification::Compiled { .. })));
        assert!(notes.iter().any(|n| matches!(n, Notification::Unloaded)));
        assert!(notes.iter().any(|n| matches!(n, Notification::Loaded { version: 1098, .. })));
        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::Progress(e) if e.id == ProgressKind::Load)));
    }

    #[test]
    fn failed_compile_writes_nothing_and_keeps_versions() {
        let dir = tempfile::tempdir().unwrap();
        let (dat, spr) = (dir.path().join("Tibia.dat"), dir.path().join("Tibia.spr"));
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1)]).unwrap();
        let mut outfit = Thing::new(0, ThingCategory::Outfit);
        outfit.group_mut(FrameGroupType::Default).unwrap().sprites = vec![SpriteRef::Resolved(1)];
        ws.add_thing(outfit).unwrap();
        ws.convert_frame_groups(Direction::ToFrameGroups).unwrap();

        // split outfits have no layout in a pre-frame-group file
        assert!(!ws.compile_as(&dat, &spr, 860, FormatFeatures::default()));
        assert_eq!(ws.sprites().unwrap().version().value, 1098);
        assert_eq!(ws.things().unwrap().version().value, 1098);
        assert!(ws.things().unwrap().features().frame_groups);
        assert!(ws.sprites().unwrap().is_changed());
        assert!(!spr.exists());
        assert!(!dat.exists());
        assert!(!OtfiFile::path_for(&dat).exists());
    }

    #[test]
    fn failed_load_keeps_current_pair() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        ws.add_sprites(vec![solid(3)]).unwrap();
        let missing = dir.path().join("missing.dat");
        assert!(ws.load(&missing, &missing, 1098, FormatFeatures::default()).is_err());
        assert!(ws.is_loaded());
        assert_eq!(ws.sprites().unwrap().sprites_count(), 1);
        assert!(ws
            .drain_notifications()
            .iter()
            .any(|n| matches!(n, Notification::Error(_))));
    }

    #[test]
    fn cascade_removal_blanks_references() {
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2)]).unwrap();
        ws.add_thing(item(&[1, 2])).unwrap();

        let removal = ws.remove_sprites(&[1], true).unwrap();
        assert_eq!(removal.removed.removed.len(), 1);
        assert_eq!(refs(&ws, 100), vec![SpriteRef::BLANK, SpriteRef::Resolved(1)]);
        assert_eq!(ws.sprites().unwrap().get_pixels(1), Some(&solid(2)[..]));
        assert!(ws.verify_references().unwrap().is_empty());
    }

    #[test]
    fn removal_without_cascade_fails_whole() {
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2), solid(3)]).unwrap();
        ws.add_thing(item(&[2])).unwrap();

        let err = ws.remove_sprites(&[1, 2], false).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Store(StoreError::StillReferenced { sprite: 2, thing: 100, .. })
        ));
        assert_eq!(ws.sprites().unwrap().sprites_count(), 3);

        // unreferenced removal renumbers the survivors
        ws.remove_sprites_default(&[1]).unwrap();
        assert_eq!(refs(&ws, 100), vec![SpriteRef::Resolved(1)]);
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1)]).unwrap();
        ws.add_thing(item(&[1, 7])).unwrap();
        let warnings = ws.verify_references().unwrap();
        assert_eq!(
            warnings,
            vec![ReferenceWarning {
                category: ThingCategory::Item,
                thing: 100,
                group: FrameGroupType::Default,
                slot: 1,
                sprite: 7,
            }]
        );
        let export = ws.export_obd(100, ThingCategory::Item).unwrap();
        assert_eq!(export.warnings, warnings);
    }

    #[test]
    fn obd_roundtrip_into_same_and_fresh_workspace() {
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2)]).unwrap();
        ws.add_thing(item(&[1, 2, 0, 1])).unwrap();
        let bytes = ws.export_obd(100, ThingCategory::Item).unwrap().bytes;

        let same = ws.import_obd(&bytes).unwrap();
        assert_eq!(same.id, 101);
        assert_eq!(same.sprites_added, 0);
        assert_eq!(same.sprites_reused, 3);
        assert_eq!(refs(&ws, 101), refs(&ws, 100));

        let mut fresh = workspace();
        fresh.add_sprites(vec![solid(9)]).unwrap();
        let imported = fresh.import_obd(&bytes).unwrap();
        assert_eq!(imported.sprites_added, 2);
        let sprites = fresh.sprites().unwrap();
        let got: Vec<Vec<u8>> = refs(&fresh, imported.id)
            .iter()
            .map(|r| sprites.get_pixels(r.id().unwrap()).unwrap().to_vec())
            .collect();
        let blank = forge_types::pixels::blank_pixels();
        assert_eq!(got, vec![solid(1), solid(2), blank, solid(1)]);
    }

    #[test]
    fn failed_import_rolls_back_sprites() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1)]).unwrap();
        let mut outfit = Thing::new(0, ThingCategory::Outfit);
        outfit.group_mut(FrameGroupType::Default).unwrap().sprites = vec![SpriteRef::Resolved(1)];
        ws.add_thing(outfit).unwrap();
        ws.convert_frame_groups(Direction::ToFrameGroups).unwrap();
        let bytes = ws.export_obd(1, ThingCategory::Outfit).unwrap().bytes;

        // a legacy pair cannot hold split groups
        let mut legacy = Workspace::new(WorkspaceConfig::default()).unwrap();
        legacy.create_new(860, FormatFeatures::default()).unwrap();
        legacy.add_sprites(vec![solid(5)]).unwrap();
        assert!(legacy.compile(
            &dir.path().join("legacy.dat"),
            &dir.path().join("legacy.spr"),
        ));
        assert!(!legacy.sprites().unwrap().is_changed());
        assert!(legacy.import_obd(&bytes).is_err());
        assert_eq!(legacy.sprites().unwrap().sprites_count(), 1);
        assert!(!legacy.sprites().unwrap().is_changed());
        assert!(!legacy.things().unwrap().is_changed());
    }

    #[test]
    fn merge_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let (dat, spr) = (dir.path().join("b.dat"), dir.path().join("b.spr"));
        let mut source = workspace();
        source.add_sprites(vec![solid(4)]).unwrap();
        source.add_thing(item(&[1])).unwrap();
        assert!(source.compile(&dat, &spr));

        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2)]).unwrap();
        ws.add_thing(item(&[2])).unwrap();
        let report = ws.merge(&dat, &spr, 1098, FormatFeatures::default()).unwrap();
        assert_eq!(report.sprite_offset, 2);
        assert_eq!(refs(&ws, 101), vec![SpriteRef::Resolved(3)]);
        assert_eq!(ws.sprites().unwrap().get_pixels(3), Some(&solid(4)[..]));
        assert!(ws
            .drain_notifications()
            .iter()
            .any(|n| matches!(n, Notification::Progress(e) if e.id == ProgressKind::Merge)));
    }

    #[test]
    fn optimize_then_verify() {
        let mut ws = workspace();
        ws.add_sprites(vec![solid(1), solid(2), solid(1)]).unwrap();
        ws.add_thing(item(&[3])).unwrap();
        let report = ws.optimize_sprites().unwrap();
        assert_eq!(report.new_count, 1);
        assert_eq!(refs(&ws, 100), vec![SpriteRef::Resolved(1)]);
        assert!(ws.verify_references().unwrap().is_empty());

        let settings = DurationSettings::default().with_bounds(
            ThingCategory::Item,
            forge_optimize::DurationBounds::new(100, 200).unwrap(),
        );
        assert_eq!(ws.optimize_durations(settings).unwrap().total(), 0);
    }
}
