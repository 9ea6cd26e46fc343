use forge_types::{ClientVersion, FormatFeatures};

use crate::flags::{FlagEntry, FlagSet};

/// Width of sprite ids in thing records and of the sprite file count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdWidth {
    U16,
    U32,
}

impl IdWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Largest id representable at this width.
    pub fn max_id(self) -> u32 {
        match self {
            Self::U16 => u16::MAX as u32,
            Self::U32 => u32::MAX,
        }
    }
}

/// Every layout decision the codecs need for one version and feature set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldTable {
    pub version: u32,
    pub dat_signature: u32,
    pub spr_signature: u32,
    pub features: FormatFeatures,
    pub sprite_ids: IdWidth,
    pub has_pattern_z: bool,
    pub flags: FlagSet,
    reserved: Vec<(u8, usize)>,
}

impl FieldTable {
    pub fn new(version: &ClientVersion, features: FormatFeatures) -> Self {
        let features = features.normalized(version.value);
        Self {
            version: version.value,
            dat_signature: version.dat_signature,
            spr_signature: version.spr_signature,
            features,
            sprite_ids: if features.extended {
                IdWidth::U32
            } else {
                IdWidth::U16
            },
            has_pattern_z: version.has_pattern_z(),
            flags: FlagSet::for_version(version.value),
            reserved: Vec::new(),
        }
    }

    /// Declare a flag code this build does not model; decoding skips its
    /// `width` payload bytes instead of failing.
    pub fn with_reserved_flag(mut self, code: u8, width: usize) -> Self {
        self.reserved.retain(|(c, _)| *c != code);
        self.reserved.push((code, width));
        self
    }

    pub fn entry(&self, code: u8) -> Option<FlagEntry> {
        if let Some(kind) = self.flags.kind(code) {
            return Some(FlagEntry::Property(kind));
        }
        self.reserved
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, width)| FlagEntry::Reserved { width: *width })
    }

    pub fn has_frame_durations(&self) -> bool {
        self.features.improved_animations
    }

    pub fn has_frame_groups(&self) -> bool {
        self.features.frame_groups
    }

    pub fn transparency(&self) -> bool {
        self.features.transparency
    }

    /// Highest sprite id the sprite file can address. The top 32-bit id is
    /// kept back as the in-memory alert sprite.
    pub fn sprite_capacity(&self) -> u32 {
        match self.sprite_ids {
            IdWidth::U16 => IdWidth::U16.max_id(),
            IdWidth::U32 => u32::MAX - 1,
        }
    }
}
