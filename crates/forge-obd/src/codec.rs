use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use forge_codec::{read_thing, write_thing, ByteReader, ByteWriter, FieldTable, IdWidth};
use forge_types::{
    pixels, ClientVersion, FormatFeatures, FrameGroupType, SpriteRef, Thing, ThingCategory,
    VersionTable, SPRITE_DATA_SIZE, SPRITE_SIZE,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ObdError, ObdResult};

/// zstd level used for container bodies.
const COMPRESSION_LEVEL: i32 = 3;

/// Upper bound on a decompressed body: a 255-phase outfit never gets close.
const MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Container layout generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObdVersion {
    /// Single frame group, 16-bit sprite markers, no durations.
    V1,
    /// 32-bit markers and per-phase durations.
    V2,
    /// Adds native Idle/Walking frame groups.
    #[default]
    V3,
}

impl ObdVersion {
    /// Leading code of V2 and V3 bodies. V1 bodies start with the client
    /// version instead, which is never this small.
    pub fn code(self) -> Option<u16> {
        match self {
            Self::V1 => None,
            Self::V2 => Some(200),
            Self::V3 => Some(300),
        }
    }

    fn id_width(self) -> IdWidth {
        match self {
            Self::V1 => IdWidth::U16,
            Self::V2 | Self::V3 => IdWidth::U32,
        }
    }

    fn pending_marker(self) -> u32 {
        self.id_width().max_id()
    }

    /// Field table for a thing record inside this container.
    fn field_table(self, client: &ClientVersion) -> FieldTable {
        let mut table = FieldTable::new(client, FormatFeatures::default());
        table.features = FormatFeatures {
            extended: self != Self::V1,
            transparency: true,
            improved_animations: self != Self::V1,
            frame_groups: self == Self::V3,
        };
        table.sprite_ids = self.id_width();
        table
    }
}

impl fmt::Display for ObdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("OBD v1"),
            Self::V2 => f.write_str("OBD v2"),
            Self::V3 => f.write_str("OBD v3"),
        }
    }
}

/// One sprite table entry of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObdSprite {
    /// Id the sprite had where it came from, or `Pending` if it never had one.
    pub id: SpriteRef,
    /// 32x32 RGBA pixels.
    pub pixels: Vec<u8>,
}

impl ObdSprite {
    pub fn new(id: SpriteRef, pixels: Vec<u8>) -> Self {
        Self { id, pixels }
    }

    pub fn blank() -> Self {
        Self::new(SpriteRef::BLANK, pixels::blank_pixels())
    }

    pub fn is_blank(&self) -> bool {
        pixels::is_blank(&self.pixels)
    }
}

/// A thing plus the pixels of every entry of its sprite tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObdObject {
    pub version: ObdVersion,
    pub client_version: u32,
    pub thing: Thing,
    /// One entry per sprite table slot, in table order.
    pub sprites: BTreeMap<FrameGroupType, Vec<ObdSprite>>,
}

impl ObdObject {
    pub fn category(&self) -> ThingCategory {
        self.thing.category
    }

    /// Number of non-blank sprites carried.
    pub fn sprite_count(&self) -> usize {
        self.sprites
            .values()
            .flatten()
            .filter(|s| !s.is_blank())
            .count()
    }
}

/// Encoder and decoder of exchange containers.
pub struct ObdCodec;

impl ObdCodec {
    /// Encode `object` in its own version.
    ///
    /// The thing's sprite table is written with positional markers; the
    /// pixels follow as `(id, width, height, length, bytes)` blocks.
    pub fn encode(object: &ObdObject, client: &ClientVersion) -> ObdResult<Vec<u8>> {
        let version = object.version;
        let unsupported = |reason: String| ObdError::Unsupported {
            version: version.to_string(),
            reason,
        };
        if client.value > u16::MAX as u32 {
            return Err(unsupported(format!("client version {}", client.value)));
        }

        if let Some(kind) = object.sprites.keys().find(|k| !object.thing.groups.contains_key(k)) {
            return Err(ObdError::Malformed(format!(
                "sprite pixels for frame group {kind:?}, which the thing does not have"
            )));
        }

        let mut record = object.thing.clone();
        let mut marker = 0u32;
        for (kind, group) in record.groups.iter_mut() {
            let entries = object.sprites.get(kind).ok_or_else(|| {
                ObdError::Malformed(format!("no sprite pixels for frame group {kind:?}"))
            })?;
            if entries.len() != group.sprites.len() {
                return Err(ObdError::Malformed(format!(
                    "frame group {kind:?} has {} table entries but {} sprites",
                    group.sprites.len(),
                    entries.len()
                )));
            }
            for (slot, entry) in group.sprites.iter_mut().zip(entries) {
                if entry.pixels.len() != SPRITE_DATA_SIZE {
                    return Err(ObdError::Malformed(format!(
                        "sprite buffer has {} bytes",
                        entry.pixels.len()
                    )));
                }
                *slot = if entry.is_blank() {
                    SpriteRef::BLANK
                } else {
                    marker += 1;
                    SpriteRef::Resolved(marker)
                };
            }
        }
        if marker > version.pending_marker() - 1 {
            return Err(unsupported(format!("{marker} sprites")));
        }
        if record.groups.len() > 1 && version != ObdVersion::V3 {
            return Err(unsupported("split frame groups".into()));
        }
        // the importer assigns the id
        record.id = 0;

        let table = version.field_table(client);
        let mut w = ByteWriter::with_capacity(64 + marker as usize * (SPRITE_DATA_SIZE + 12));
        if let Some(code) = version.code() {
            w.u16(code);
        }
        w.u16(client.value as u16);
        w.u8(record.category.to_byte());
        write_thing(&mut w, &record, &table)?;

        for entries in object.sprites.values() {
            for entry in entries {
                let id = match entry.id {
                    SpriteRef::Resolved(id) if id < version.pending_marker() => id,
                    _ => version.pending_marker(),
                };
                match version.id_width() {
                    IdWidth::U16 => w.u16(id as u16),
                    IdWidth::U32 => w.u32(id),
                }
                w.u16(SPRITE_SIZE as u16);
                w.u16(SPRITE_SIZE as u16);
                if entry.is_blank() {
                    w.u32(0);
                } else {
                    w.u32(SPRITE_DATA_SIZE as u32);
                    w.bytes(&entry.pixels);
                }
            }
        }

        let body = w.into_inner();
        let compressed = zstd::bulk::compress(&body, COMPRESSION_LEVEL)?;
        debug!(
            %version,
            category = %record.category,
            sprites = marker,
            body = body.len(),
            compressed = compressed.len(),
            "encoded exchange container"
        );
        Ok(compressed)
    }

    /// Decode a container. The client version in the header is looked up
    /// in `versions`.
    pub fn decode(data: &[u8], versions: &VersionTable) -> ObdResult<ObdObject> {
        let mut body = Vec::new();
        zstd::stream::read::Decoder::new(data)?
            .take(MAX_BODY_SIZE as u64 + 1)
            .read_to_end(&mut body)?;
        if body.len() > MAX_BODY_SIZE {
            return Err(ObdError::Malformed("decompressed body is too large".into()));
        }
        let mut r = ByteReader::new(&body);

        let lead = r.u16()?;
        let (version, client_value) = match lead {
            200 => (ObdVersion::V2, r.u16()?),
            300 => (ObdVersion::V3, r.u16()?),
            value => (ObdVersion::V1, value),
        };
        let client = versions.require(client_value as u32)?;
        let category = ThingCategory::from_byte(r.u8()?)?;
        let table = version.field_table(client);
        let mut thing = read_thing(&mut r, 0, category, &table)?;

        let mut sprites = BTreeMap::new();
        for (kind, group) in thing.groups.iter_mut() {
            let mut entries = Vec::with_capacity(group.sprites.len());
            for slot in group.sprites.iter_mut() {
                let offset = r.position();
                let raw = match version.id_width() {
                    IdWidth::U16 => r.u16()? as u32,
                    IdWidth::U32 => r.u32()?,
                };
                let width = r.u16()? as usize;
                let height = r.u16()? as usize;
                let len = r.u32()? as usize;
                if width != SPRITE_SIZE || height != SPRITE_SIZE {
                    return Err(ObdError::Malformed(format!(
                        "sprite at {offset} is {width}x{height}"
                    )));
                }
                let pixels = match len {
                    0 => pixels::blank_pixels(),
                    SPRITE_DATA_SIZE => r.take(len)?.to_vec(),
                    other => {
                        return Err(ObdError::Malformed(format!(
                            "sprite at {offset} carries {other} pixel bytes"
                        )))
                    }
                };
                let id = if raw == version.pending_marker() {
                    SpriteRef::Pending
                } else {
                    SpriteRef::Resolved(raw)
                };
                let entry = ObdSprite::new(id, pixels);
                *slot = if entry.is_blank() {
                    SpriteRef::BLANK
                } else {
                    SpriteRef::Pending
                };
                entries.push(entry);
            }
            sprites.insert(*kind, entries);
        }

        if r.remaining() != 0 {
            return Err(ObdError::Malformed(format!(
                "{} trailing bytes",
                r.remaining()
            )));
        }
        debug!(%version, %category, client = client_value, "decoded exchange container");
        Ok(ObdObject {
            version,
            client_version: client_value as u32,
            thing,
            sprites,
        })
    }
}
