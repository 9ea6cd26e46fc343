use serde::{Deserialize, Serialize};

/// Optional format flags that are not derivable from file headers alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatFeatures {
    /// 32-bit sprite ids and sprite count.
    pub extended: bool,
    /// Sprite pixels carry an alpha channel.
    pub transparency: bool,
    /// Groups with more than one phase persist per-phase durations.
    pub improved_animations: bool,
    /// Outfits persist separate Idle and Walking groups.
    pub frame_groups: bool,
}

impl FormatFeatures {
    /// The flags a client version implies on its own.
    pub fn for_version(value: u32) -> Self {
        Self {
            extended: value >= 960,
            transparency: false,
            improved_animations: value >= 1050,
            frame_groups: value >= 1057,
        }
    }

    /// Force on every flag the version mandates, keeping optional ones.
    pub fn normalized(self, value: u32) -> Self {
        let implied = Self::for_version(value);
        Self {
            extended: self.extended || implied.extended,
            transparency: self.transparency,
            improved_animations: self.improved_animations || implied.improved_animations,
            frame_groups: self.frame_groups || implied.frame_groups,
        }
    }

    pub fn with_extended(mut self, on: bool) -> Self {
        self.extended = on;
        self
    }

    pub fn with_transparency(mut self, on: bool) -> Self {
        self.transparency = on;
        self
    }

    pub fn with_improved_animations(mut self, on: bool) -> Self {
        self.improved_animations = on;
        self
    }

    pub fn with_frame_groups(mut self, on: bool) -> Self {
        self.frame_groups = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_defaults() {
        let old = FormatFeatures::for_version(860);
        assert!(!old.extended && !old.improved_animations && !old.frame_groups);

        let modern = FormatFeatures::for_version(1098);
        assert!(modern.extended && modern.improved_animations && modern.frame_groups);
        assert!(!modern.transparency);
    }

    #[test]
    fn normalized_keeps_optional_flags() {
        let chosen = FormatFeatures::default()
            .with_extended(true)
            .with_transparency(true);
        let n = chosen.normalized(860);
        assert!(n.extended && n.transparency);
        assert!(!n.frame_groups);

        let forced = FormatFeatures::default().normalized(1057);
        assert!(forced.extended && forced.improved_animations && forced.frame_groups);
    }
}
