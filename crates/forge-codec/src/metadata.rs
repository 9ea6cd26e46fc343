//! Metadata file: signature, four category counts, then every thing record.

use forge_types::{NoProgress, ProgressKind, ProgressSink, Reporter, Thing, ThingCategory};
use tracing::debug;

use crate::error::{CodecError, CodecResult};
use crate::fields::FieldTable;
use crate::reader::ByteReader;
use crate::thing::{read_thing, write_thing};
use crate::writer::ByteWriter;

/// Header size: signature plus four 16-bit max ids. The max ids stay 16-bit
/// in extended mode too; only sprite ids widen.
pub const HEADER_SIZE: usize = 4 + 4 * 2;

/// A decoded metadata file. Each category list is dense and ascending from
/// the category's first id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFile {
    pub signature: u32,
    pub things: [Vec<Thing>; 4],
}

impl MetadataFile {
    pub fn category(&self, category: ThingCategory) -> &[Thing] {
        &self.things[category.index()]
    }

    pub fn max_id(&self, category: ThingCategory) -> u32 {
        category.min_id() + self.things[category.index()].len() as u32 - 1
    }

    pub fn len(&self) -> usize {
        self.things.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Peek the signature of a metadata or sprite file.
pub fn read_signature(data: &[u8]) -> CodecResult<u32> {
    ByteReader::new(data).u32()
}

/// Decode a metadata file, reporting once per `chunk` things.
pub fn decode_metadata(
    data: &[u8],
    table: &FieldTable,
    chunk: usize,
    sink: &mut dyn ProgressSink,
) -> CodecResult<MetadataFile> {
    let mut r = ByteReader::new(data);
    let signature = r.u32()?;
    if signature != table.dat_signature {
        return Err(CodecError::InvalidSignature {
            expected: table.dat_signature,
            actual: signature,
        });
    }

    let mut counts = [0usize; 4];
    for category in ThingCategory::ALL {
        let offset = r.position();
        let max_id = r.u16()? as u32;
        let min = category.min_id();
        // an empty category stores min - 1 as its max id
        if max_id + 1 < min {
            return Err(CodecError::ImpossibleLength {
                offset,
                reason: format!("{category} max id {max_id} is below {min}"),
            });
        }
        counts[category.index()] = (max_id + 1 - min) as usize;
    }

    let total = counts.iter().sum();
    let mut reporter = Reporter::new(ProgressKind::Load, "things", total, chunk);
    let mut file = MetadataFile {
        signature,
        things: Default::default(),
    };
    for category in ThingCategory::ALL {
        let count = counts[category.index()];
        let list = &mut file.things[category.index()];
        list.reserve(count);
        for i in 0..count {
            let id = category.min_id() + i as u32;
            list.push(read_thing(&mut r, id, category, table)?);
            reporter.advance(1, sink);
        }
    }
    reporter.finish(sink);

    if r.remaining() != 0 {
        return Err(CodecError::ImpossibleLength {
            offset: r.position(),
            reason: format!("{} trailing bytes after the last record", r.remaining()),
        });
    }
    debug!(
        version = table.version,
        items = counts[0],
        outfits = counts[1],
        effects = counts[2],
        missiles = counts[3],
        "decoded metadata"
    );
    Ok(file)
}

/// Encode a metadata file. Lists must be dense and start at each
/// category's first id.
pub fn encode_metadata(
    file: &MetadataFile,
    table: &FieldTable,
    chunk: usize,
    sink: &mut dyn ProgressSink,
) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::with_capacity(HEADER_SIZE + file.len() * 32);
    w.u32(file.signature);
    for category in ThingCategory::ALL {
        let list = file.category(category);
        let max_id = category.min_id() as usize + list.len() - 1;
        if max_id > u16::MAX as usize {
            return Err(CodecError::ImpossibleLength {
                offset: w.len(),
                reason: format!("{category} max id {max_id} exceeds the 16-bit header"),
            });
        }
        w.u16(max_id as u16);
    }

    let mut reporter = Reporter::new(ProgressKind::Compile, "things", file.len(), chunk);
    for category in ThingCategory::ALL {
        for (i, thing) in file.category(category).iter().enumerate() {
            let expected = category.min_id() + i as u32;
            if thing.id != expected || thing.category != category {
                return Err(CodecError::InvalidThing {
                    category: thing.category,
                    id: thing.id,
                    reason: format!("out of place, expected {category} {expected}"),
                });
            }
            write_thing(&mut w, thing, table)?;
            reporter.advance(1, sink);
        }
    }
    reporter.finish(sink);
    Ok(w.into_inner())
}

impl MetadataFile {
    /// Convenience decode without progress reporting.
    pub fn decode(data: &[u8], table: &FieldTable) -> CodecResult<Self> {
        decode_metadata(data, table, usize::MAX, &mut NoProgress)
    }

    pub fn encode(&self, table: &FieldTable) -> CodecResult<Vec<u8>> {
        encode_metadata(self, table, usize::MAX, &mut NoProgress)
    }
}
