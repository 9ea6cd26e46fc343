use std::path::{Path, PathBuf};

use forge_convert::ConvertOptions;
use forge_obd::ObdVersion;
use forge_optimize::SpriteOptions;
use forge_types::VersionTable;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Settings of a [`Workspace`](crate::Workspace).
///
/// ```toml
/// progress_chunk = 500
/// cascade_sprite_removal = true
/// obd_version = "v2"
/// version_table = "versions.toml"
///
/// [sprite_optimizer]
/// remove_unused = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Items per progress notification in long passes.
    pub progress_chunk: usize,
    /// Whether removing a referenced sprite blanks its references instead
    /// of failing.
    pub cascade_sprite_removal: bool,
    /// Container layout written by exports.
    pub obd_version: ObdVersion,
    /// Custom version table; the built-in one is used when unset.
    pub version_table: Option<PathBuf>,
    pub sprite_optimizer: SpriteOptions,
    pub frame_groups: ConvertOptions,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            progress_chunk: 1000,
            cascade_sprite_removal: false,
            obd_version: ObdVersion::default(),
            version_table: None,
            sprite_optimizer: SpriteOptions::default(),
            frame_groups: ConvertOptions::default(),
        }
    }
}

impl WorkspaceConfig {
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        toml::from_str(source).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> SdkResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// The version table this configuration selects.
    pub fn versions(&self) -> SdkResult<VersionTable> {
        match &self.version_table {
            Some(path) => Ok(VersionTable::from_toml_file(path)?),
            None => Ok(VersionTable::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = WorkspaceConfig::default();
        assert_eq!(c.progress_chunk, 1000);
        assert!(!c.cascade_sprite_removal);
        assert_eq!(c.obd_version, ObdVersion::V3);
        assert!(c.version_table.is_none());
        assert!(c.versions().unwrap().get(1098).is_some());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = WorkspaceConfig::from_toml_str(
            "cascade_sprite_removal = true\nobd_version = \"v2\"\n[sprite_optimizer]\nremove_unused = false\n",
        )
        .unwrap();
        assert!(c.cascade_sprite_removal);
        assert_eq!(c.obd_version, ObdVersion::V2);
        assert!(!c.sprite_optimizer.remove_unused);
        assert!(c.sprite_optimizer.merge_duplicates);
        assert_eq!(c.progress_chunk, 1000);
    }

    #[test]
    fn toml_roundtrip() {
        let c = WorkspaceConfig {
            progress_chunk: 7,
            ..WorkspaceConfig::default()
        };
        let parsed = WorkspaceConfig::from_toml_str(&c.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            WorkspaceConfig::from_toml_str("progress_chunk = \"many\""),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn custom_version_table_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        std::fs::write(
            &path,
            "[[version]]\nvalue = 1100\ndescription = \"11.00\"\ndat_signature = 1\nspr_signature = 2\n",
        )
        .unwrap();
        let c = WorkspaceConfig {
            version_table: Some(path),
            ..WorkspaceConfig::default()
        };
        let table = c.versions().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.by_signatures(1, 2).unwrap().value, 1100);
    }
}
