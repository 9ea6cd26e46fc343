use serde::{Deserialize, Serialize};

use crate::category::ThingCategory;
use crate::error::TypeError;
use crate::pixels::SPRITE_SIZE;
use crate::sprite_ref::{SpriteId, SpriteRef};

/// Animation state a frame group describes.
///
/// Legacy formats carry a single `Default` group. Formats with frame groups
/// split outfits into `Idle` and `Walking`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameGroupType {
    Default,
    Idle,
    Walking,
}

impl FrameGroupType {
    /// Wire byte in group-prefixed records. `Default` and `Idle` share code 0.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Default | Self::Idle => 0,
            Self::Walking => 1,
        }
    }

    /// Decode a group type byte of a multi-group record.
    pub fn from_byte(byte: u8) -> Result<Self, TypeError> {
        match byte {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Walking),
            other => Err(TypeError::UnknownFrameGroup(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationMode {
    #[default]
    Async,
    Sync,
}

impl AnimationMode {
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Async => 0,
            Self::Sync => 1,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        if byte == 1 {
            Self::Sync
        } else {
            Self::Async
        }
    }
}

/// Duration bounds of one animation phase, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameDuration {
    pub minimum: u32,
    pub maximum: u32,
}

impl FrameDuration {
    pub fn new(minimum: u32, maximum: u32) -> Self {
        Self { minimum, maximum }
    }

    /// Client default for formats that do not persist durations.
    pub fn default_for(category: ThingCategory) -> Self {
        let ms = match category {
            ThingCategory::Item => 500,
            ThingCategory::Outfit => 300,
            ThingCategory::Effect | ThingCategory::Missile => 100,
        };
        Self::new(ms, ms)
    }
}

/// Per-phase timing of a group with more than one phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAnimation {
    pub mode: AnimationMode,
    pub loop_count: i32,
    pub start_phase: i8,
    pub durations: Vec<FrameDuration>,
}

impl FrameAnimation {
    pub fn with_defaults(phases: u8, category: ThingCategory) -> Self {
        Self {
            mode: AnimationMode::Async,
            loop_count: 0,
            start_phase: 0,
            durations: vec![FrameDuration::default_for(category); phases as usize],
        }
    }
}

/// One animation state of a Thing and its sprite table.
///
/// The sprite table has one entry per (width, height, layer, pattern x,
/// pattern y, pattern z, phase) tuple, phase outermost and width innermost,
/// so each phase occupies a contiguous slice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGroup {
    pub kind: FrameGroupType,
    pub width: u8,
    pub height: u8,
    pub exact_size: u8,
    pub layers: u8,
    pub pattern_x: u8,
    pub pattern_y: u8,
    pub pattern_z: u8,
    pub phases: u8,
    pub animation: Option<FrameAnimation>,
    pub sprites: Vec<SpriteRef>,
}

impl FrameGroup {
    /// A 1x1 single-phase group with one blank sprite.
    pub fn new(kind: FrameGroupType) -> Self {
        Self {
            kind,
            width: 1,
            height: 1,
            exact_size: SPRITE_SIZE as u8,
            layers: 1,
            pattern_x: 1,
            pattern_y: 1,
            pattern_z: 1,
            phases: 1,
            animation: None,
            sprites: vec![SpriteRef::BLANK],
        }
    }

    /// Entries in one phase.
    pub fn phase_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.layers as usize
            * self.pattern_x as usize
            * self.pattern_y as usize
            * self.pattern_z as usize
    }

    /// Entries the sprite table must hold for the current dimensions.
    pub fn expected_len(&self) -> usize {
        self.phase_len() * self.phases as usize
    }

    /// Dimensions, table length, and animation all agree.
    pub fn is_consistent(&self) -> bool {
        if self.width == 0
            || self.height == 0
            || self.layers == 0
            || self.pattern_x == 0
            || self.pattern_y == 0
            || self.pattern_z == 0
            || self.phases == 0
        {
            return false;
        }
        let animation_ok = match &self.animation {
            Some(anim) => self.phases > 1 && anim.durations.len() == self.phases as usize,
            None => self.phases == 1,
        };
        animation_ok && self.sprites.len() == self.expected_len()
    }

    /// Table index of one tile.
    #[allow(clippy::too_many_arguments)]
    pub fn sprite_slot(
        &self,
        w: u8,
        h: u8,
        layer: u8,
        x: u8,
        y: u8,
        z: u8,
        phase: u8,
    ) -> usize {
        let phase = (phase % self.phases.max(1)) as usize;
        ((((((phase * self.pattern_z as usize + z as usize) * self.pattern_y as usize
            + y as usize)
            * self.pattern_x as usize
            + x as usize)
            * self.layers as usize
            + layer as usize)
            * self.height as usize
            + h as usize)
            * self.width as usize)
            + w as usize
    }

    /// Entries of one phase.
    pub fn phase_sprites(&self, phase: u8) -> &[SpriteRef] {
        let len = self.phase_len();
        let start = phase as usize * len;
        &self.sprites[start.min(self.sprites.len())..(start + len).min(self.sprites.len())]
    }

    /// Same shape (everything but the phase count).
    pub fn same_shape(&self, other: &FrameGroup) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.exact_size == other.exact_size
            && self.layers == other.layers
            && self.pattern_x == other.pattern_x
            && self.pattern_y == other.pattern_y
            && self.pattern_z == other.pattern_z
    }

    /// Resolved non-blank sprite ids referenced by this group.
    pub fn sprite_ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.sprites.iter().filter_map(|r| r.sprite_id())
    }

    /// Rebuild the animation table after a phase count change.
    pub fn reset_animation(&mut self, category: ThingCategory) {
        self.animation = if self.phases > 1 {
            Some(FrameAnimation::with_defaults(self.phases, category))
        } else {
            None
        };
    }
}
