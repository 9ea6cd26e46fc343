//! `.otfi` sidecar: format flags that the binary headers cannot express.
//!
//! ```text
//! DatSpr
//!   extended: true
//!   transparency: false
//!   frame-groups: true
//!   improved-animations: true
//!   metadata-file: Tibia.dat
//!   sprites-file: Tibia.spr
//!   sprite-size: 32
//!   sprite-data-size: 4096
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use forge_store::file::write_atomic;
use forge_types::{FormatFeatures, SPRITE_DATA_SIZE, SPRITE_SIZE};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

const ROOT_NODE: &str = "DatSpr";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtfiFile {
    pub features: FormatFeatures,
    pub metadata_file: Option<String>,
    pub sprites_file: Option<String>,
    pub sprite_size: u32,
    pub sprite_data_size: u32,
}

impl OtfiFile {
    pub fn new(features: FormatFeatures) -> Self {
        Self {
            features,
            metadata_file: None,
            sprites_file: None,
            sprite_size: SPRITE_SIZE as u32,
            sprite_data_size: SPRITE_DATA_SIZE as u32,
        }
    }

    /// Sidecar path for a metadata file: same stem, `.otfi` extension.
    pub fn path_for(dat: &Path) -> PathBuf {
        dat.with_extension("otfi")
    }

    pub fn parse(source: &str) -> Result<Self, String> {
        let mut lines = source.lines().filter(|l| !l.trim().is_empty());
        match lines.next().map(str::trim) {
            Some(ROOT_NODE) => {}
            other => return Err(format!("expected {ROOT_NODE}, found {other:?}")),
        }

        let mut otfi = Self::new(FormatFeatures::default());
        for line in lines {
            let (key, value) = line
                .trim()
                .split_once(':')
                .ok_or_else(|| format!("not a key/value line: {line:?}"))?;
            let value = value.trim();
            let flag = || match value {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(format!("{key}: expected true or false, found {other:?}")),
            };
            let number = || {
                value
                    .parse::<u32>()
                    .map_err(|_| format!("{key}: expected a number, found {value:?}"))
            };
            match key.trim() {
                "extended" => otfi.features.extended = flag()?,
                "transparency" => otfi.features.transparency = flag()?,
                "frame-groups" => otfi.features.frame_groups = flag()?,
                "improved-animations" => otfi.features.improved_animations = flag()?,
                "metadata-file" => otfi.metadata_file = Some(value.to_string()),
                "sprites-file" => otfi.sprites_file = Some(value.to_string()),
                "sprite-size" => otfi.sprite_size = number()?,
                "sprite-data-size" => otfi.sprite_data_size = number()?,
                other => debug!(key = other, "ignoring unknown sidecar key"),
            }
        }
        Ok(otfi)
    }

    /// Read a sidecar. A missing file is `Ok(None)`.
    pub fn read(path: &Path) -> SdkResult<Option<Self>> {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let otfi = Self::parse(&source).map_err(|reason| SdkError::Sidecar {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(Some(otfi))
    }

    pub fn write(&self, path: &Path) -> SdkResult<()> {
        write_atomic(path, self.to_string().as_bytes())?;
        Ok(())
    }
}

impl fmt::Display for OtfiFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{ROOT_NODE}")?;
        writeln!(f, "  extended: {}", self.features.extended)?;
        writeln!(f, "  transparency: {}", self.features.transparency)?;
        writeln!(f, "  frame-groups: {}", self.features.frame_groups)?;
        writeln!(f, "  improved-animations: {}", self.features.improved_animations)?;
        if let Some(name) = &self.metadata_file {
            writeln!(f, "  metadata-file: {name}")?;
        }
        if let Some(name) = &self.sprites_file {
            writeln!(f, "  sprites-file: {name}")?;
        }
        writeln!(f, "  sprite-size: {}", self.sprite_size)?;
        writeln!(f, "  sprite-data-size: {}", self.sprite_data_size)
    }
}
