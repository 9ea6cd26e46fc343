use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A client release and the file signatures that identify it.
///
/// `value` is the version number without the dot: 10.98 is `1098`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientVersion {
    pub value: u32,
    pub description: String,
    pub dat_signature: u32,
    pub spr_signature: u32,
    #[serde(default)]
    pub otb_major: u32,
}

impl ClientVersion {
    pub fn new(
        value: u32,
        description: impl Into<String>,
        dat_signature: u32,
        spr_signature: u32,
        otb_major: u32,
    ) -> Self {
        Self {
            value,
            description: description.into(),
            dat_signature,
            spr_signature,
            otb_major,
        }
    }

    /// Pattern Z (mount/addon axis) is written from 7.55 on.
    pub fn has_pattern_z(&self) -> bool {
        self.value >= 755
    }
}

/// Explicit registry of known client versions.
///
/// Passed into store construction and codec calls instead of living in
/// global state. Custom tables load from TOML:
///
/// ```toml
/// [[version]]
/// value = 1098
/// description = "10.98"
/// dat_signature = 0x42A3
/// spr_signature = 0x57BBD603
/// otb_major = 3
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTable {
    #[serde(rename = "version", default)]
    versions: Vec<ClientVersion>,
}

impl VersionTable {
    pub fn new(versions: Vec<ClientVersion>) -> Self {
        Self { versions }
    }

    /// The versions shipped with the library.
    pub fn builtin() -> Self {
        Self::new(vec![
            ClientVersion::new(710, "7.10", 0x3DAF_6A85, 0x3DAF_6A9A, 1),
            ClientVersion::new(740, "7.40", 0x41BF_619C, 0x41B9_EA86, 1),
            ClientVersion::new(760, "7.60", 0x439D_5A33, 0x4398_52BE, 1),
            ClientVersion::new(800, "8.00", 0x467F_D7E6, 0x467F_9E74, 2),
            ClientVersion::new(854, "8.54", 0x4B28_B89E, 0x4B1E_2C87, 3),
            ClientVersion::new(860, "8.60", 0x4C2C_7993, 0x4C22_0594, 3),
            ClientVersion::new(960, "9.60", 0x4F85_7F8E, 0x4F75_B7AB, 3),
            ClientVersion::new(986, "9.86", 0x5170_E904, 0x5170_E96F, 3),
            ClientVersion::new(1010, "10.10", 0x5236_F129, 0x5236_1FEA, 3),
            ClientVersion::new(1057, "10.57", 0x5555_C9A1, 0x5555_C99F, 3),
            ClientVersion::new(1098, "10.98", 0x0000_42A3, 0x57BB_D603, 3),
        ])
    }

    pub fn from_toml_str(source: &str) -> Result<Self, TypeError> {
        let table: Self =
            toml::from_str(source).map_err(|e| TypeError::InvalidVersionTable(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, TypeError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), TypeError> {
        for (i, version) in self.versions.iter().enumerate() {
            let clash = self.versions[i + 1..].iter().find(|other| {
                other.value == version.value
                    || (other.dat_signature == version.dat_signature
                        && other.spr_signature == version.spr_signature)
            });
            if let Some(other) = clash {
                return Err(TypeError::InvalidVersionTable(format!(
                    "versions {} and {} collide",
                    version.description, other.description
                )));
            }
        }
        Ok(())
    }

    /// Look up by version value (e.g. `1098`).
    pub fn get(&self, value: u32) -> Option<&ClientVersion> {
        self.versions.iter().find(|v| v.value == value)
    }

    /// Look up by version value, failing with [`TypeError::UnknownVersion`].
    pub fn require(&self, value: u32) -> Result<&ClientVersion, TypeError> {
        self.get(value).ok_or(TypeError::UnknownVersion(value))
    }

    /// Identify a file pair by its header signatures.
    pub fn by_signatures(&self, dat_signature: u32, spr_signature: u32) -> Option<&ClientVersion> {
        self.versions
            .iter()
            .find(|v| v.dat_signature == dat_signature && v.spr_signature == spr_signature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientVersion> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        let table = VersionTable::builtin();
        assert!(table.validate().is_ok());
        assert!(table.len() >= 10);
    }

    #[test]
    fn lookup_by_value_and_signature() {
        let table = VersionTable::builtin();
        let v = table.get(1098).unwrap();
        assert_eq!(v.description, "10.98");
        let found = table.by_signatures(v.dat_signature, v.spr_signature).unwrap();
        assert_eq!(found.value, 1098);
        assert!(table.by_signatures(1, 2).is_none());
        assert!(matches!(table.require(1), Err(TypeError::UnknownVersion(1))));
    }

    #[test]
    fn pattern_z_threshold() {
        let table = VersionTable::builtin();
        assert!(!table.get(740).unwrap().has_pattern_z());
        assert!(table.get(760).unwrap().has_pattern_z());
    }

    #[test]
    fn parse_toml_table() {
        let source = r#"
            [[version]]
            value = 1098
            description = "10.98"
            dat_signature = 0x42A3
            spr_signature = 0x57BBD603
            otb_major = 3

            [[version]]
            value = 772
            description = "7.72"
            dat_signature = 1
            spr_signature = 2
        "#;
        let table = VersionTable::from_toml_str(source).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(772).unwrap().otb_major, 0);
    }

    #[test]
    fn duplicate_values_rejected() {
        let source = r#"
            [[version]]
            value = 860
            description = "a"
            dat_signature = 1
            spr_signature = 2

            [[version]]
            value = 860
            description = "b"
            dat_signature = 3
            spr_signature = 4
        "#;
        assert!(matches!(
            VersionTable::from_toml_str(source),
            Err(TypeError::InvalidVersionTable(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.toml");
        std::fs::write(
            &path,
            "[[version]]\nvalue = 860\ndescription = \"8.60\"\ndat_signature = 10\nspr_signature = 11\n",
        )
        .unwrap();
        let table = VersionTable::from_toml_file(&path).unwrap();
        assert_eq!(table.get(860).unwrap().spr_signature, 11);
    }
}
