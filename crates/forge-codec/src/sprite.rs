//! Sprite file codec.
//!
//! Layout: signature (u32), sprite count (u16 or u32 by id width), one u32
//! offset per sprite (0 marks a blank sprite), then one record per
//! non-blank sprite: a 3-byte colour key, a u16 payload length, and the
//! payload as a sequence of `(transparent run, coloured run, pixels)` chunks.
//! Coloured pixels are RGB, or RGBA when the transparency feature is on.
//! Trailing transparent pixels are not stored.

use forge_types::{
    pixels, NoProgress, ProgressKind, ProgressSink, Reporter, SpriteId, SPRITE_DATA_SIZE,
    SPRITE_PIXEL_COUNT,
};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::fields::{FieldTable, IdWidth};
use crate::reader::ByteReader;
use crate::writer::ByteWriter;

/// Colour key written before every sprite record: three bytes (RGB
/// magenta), not two.
pub const COLOR_KEY: [u8; 3] = [0xFF, 0x00, 0xFF];

fn bytes_per_pixel(transparency: bool) -> usize {
    if transparency {
        4
    } else {
        3
    }
}

fn check_buffer(pixels: &[u8]) -> CodecResult<()> {
    if pixels.len() != SPRITE_DATA_SIZE {
        return Err(CodecError::BadPixelBuffer {
            expected: SPRITE_DATA_SIZE,
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Bring an RGBA buffer to the form the codec reproduces exactly:
/// transparent pixels are all zero, and without the transparency feature
/// every visible pixel is fully opaque.
pub fn normalize_pixels(pixels: &mut [u8], transparency: bool) {
    for px in pixels.chunks_exact_mut(4) {
        if px[3] == 0 {
            px.copy_from_slice(&[0, 0, 0, 0]);
        } else if !transparency {
            px[3] = 0xFF;
        }
    }
}

/// Run-length pack one 32x32 RGBA buffer.
pub fn encode_pixels(pixels: &[u8], transparency: bool) -> CodecResult<Vec<u8>> {
    check_buffer(pixels)?;
    let visible = |i: usize| pixels[i * 4 + 3] != 0;
    let mut w = ByteWriter::new();
    let mut i = 0;
    while i < SPRITE_PIXEL_COUNT {
        let start = i;
        while i < SPRITE_PIXEL_COUNT && !visible(i) {
            i += 1;
        }
        if i == SPRITE_PIXEL_COUNT {
            break;
        }
        let transparent = i - start;
        let colored_start = i;
        while i < SPRITE_PIXEL_COUNT && visible(i) {
            i += 1;
        }
        w.u16(transparent as u16);
        w.u16((i - colored_start) as u16);
        for px in pixels[colored_start * 4..i * 4].chunks_exact(4) {
            if transparency {
                w.bytes(px);
            } else {
                w.bytes(&px[..3]);
            }
        }
    }
    Ok(w.into_inner())
}

/// Unpack a sprite payload into a 32x32 RGBA buffer.
pub fn decode_pixels(payload: &[u8], transparency: bool) -> CodecResult<Vec<u8>> {
    let bpp = bytes_per_pixel(transparency);
    let mut out = pixels::blank_pixels();
    let mut r = ByteReader::new(payload);
    let mut index = 0usize;
    while r.remaining() > 0 {
        let offset = r.position();
        let transparent = r.u16()? as usize;
        let colored = r.u16()? as usize;
        if index + transparent + colored > SPRITE_PIXEL_COUNT {
            return Err(CodecError::RunOverflow { offset });
        }
        index += transparent;
        for px in r.take(colored * bpp)?.chunks_exact(bpp) {
            let dst = &mut out[index * 4..index * 4 + 4];
            dst[..3].copy_from_slice(&px[..3]);
            dst[3] = if transparency { px[3] } else { 0xFF };
            index += 1;
        }
    }
    Ok(out)
}

/// A decoded sprite file. Payloads borrow from the source buffer and are
/// unpacked on demand.
#[derive(Clone, Debug)]
pub struct SpriteFile<'a> {
    pub signature: u32,
    /// Index `i` holds sprite `i + 1`; `None` is blank.
    pub records: Vec<Option<&'a [u8]>>,
}

impl<'a> SpriteFile<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// RGBA pixels of sprite `id` (1-based).
    pub fn pixels(&self, id: SpriteId, transparency: bool) -> CodecResult<Vec<u8>> {
        match self.records.get((id as usize).wrapping_sub(1)) {
            Some(Some(payload)) => decode_pixels(payload, transparency),
            _ => Ok(pixels::blank_pixels()),
        }
    }

    pub fn decode(data: &'a [u8], table: &FieldTable) -> CodecResult<Self> {
        decode_sprite_file(data, table)
    }
}

/// Parse the header and offset table and locate every record.
pub fn decode_sprite_file<'a>(data: &'a [u8], table: &FieldTable) -> CodecResult<SpriteFile<'a>> {
    let mut r = ByteReader::new(data);
    let signature = r.u32()?;
    if signature != table.spr_signature {
        return Err(CodecError::InvalidSignature {
            expected: table.spr_signature,
            actual: signature,
        });
    }
    let count = match table.sprite_ids {
        IdWidth::U16 => r.u16()? as usize,
        IdWidth::U32 => r.u32()? as usize,
    };
    let header_end = r.position() + count * 4;
    if header_end > data.len() {
        return Err(CodecError::Truncated {
            offset: r.position(),
            needed: header_end - data.len(),
        });
    }

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = r.u32()? as usize;
        if offset == 0 {
            records.push(None);
            continue;
        }
        if offset < header_end {
            return Err(CodecError::ImpossibleLength {
                offset: r.position() - 4,
                reason: format!("sprite record offset {offset} points into the header"),
            });
        }
        let mut rec = ByteReader::new(data);
        rec.seek(offset)?;
        rec.skip(COLOR_KEY.len())?;
        let len = rec.u16()? as usize;
        records.push(Some(rec.take(len)?));
    }
    debug!(version = table.version, count, "decoded sprite file header");
    Ok(SpriteFile { signature, records })
}

/// Encode a sprite file. `sprites[i]` holds the pixels of sprite `i + 1`;
/// blank sprites get offset 0 and no record.
pub fn encode_sprite_file(
    sprites: &[&[u8]],
    table: &FieldTable,
    chunk: usize,
    sink: &mut dyn ProgressSink,
) -> CodecResult<Vec<u8>> {
    let count = sprites.len();
    if count as u64 > table.sprite_capacity() as u64 {
        return Err(CodecError::ImpossibleLength {
            offset: 4,
            reason: format!(
                "{count} sprites exceed the {}-bit sprite file",
                table.sprite_ids.bits()
            ),
        });
    }
    let transparency = table.transparency();
    let mut w = ByteWriter::with_capacity(8 + count * 4 + count * 512);
    w.u32(table.spr_signature);
    match table.sprite_ids {
        IdWidth::U16 => w.u16(count as u16),
        IdWidth::U32 => w.u32(count as u32),
    }
    let table_pos = w.len();
    for _ in 0..count {
        w.u32(0);
    }

    let mut reporter = Reporter::new(ProgressKind::Compile, "sprites", count, chunk);
    for (i, px) in sprites.iter().enumerate() {
        check_buffer(px)?;
        if !pixels::is_blank(px) {
            let offset = u32::try_from(w.len()).map_err(|_| CodecError::ImpossibleLength {
                offset: w.len(),
                reason: "sprite file exceeds 4 GiB".into(),
            })?;
            let payload = encode_pixels(px, transparency)?;
            let len = u16::try_from(payload.len())
                .map_err(|_| CodecError::SpriteTooLarge(i as u32 + 1))?;
            w.bytes(&COLOR_KEY);
            w.u16(len);
            w.bytes(&payload);
            w.patch_u32(table_pos + i * 4, offset);
        }
        reporter.advance(1, sink);
    }
    reporter.finish(sink);
    Ok(w.into_inner())
}

/// Convenience encode without progress reporting.
pub fn encode_sprites(sprites: &[&[u8]], table: &FieldTable) -> CodecResult<Vec<u8>> {
    encode_sprite_file(sprites, table, usize::MAX, &mut NoProgress)
}
