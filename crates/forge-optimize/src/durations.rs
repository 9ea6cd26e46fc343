use forge_store::ThingStore;
use forge_types::{FrameDuration, ProgressKind, ProgressSink, Reporter, Thing, ThingCategory};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{OptimizeError, OptimizeResult};

/// Inclusive duration range in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    pub minimum: u32,
    pub maximum: u32,
}

impl DurationBounds {
    pub fn new(minimum: u32, maximum: u32) -> OptimizeResult<Self> {
        if minimum > maximum {
            return Err(OptimizeError::InvalidBounds(format!(
                "minimum {minimum} is above maximum {maximum}"
            )));
        }
        Ok(Self { minimum, maximum })
    }

    fn apply(&self, duration: FrameDuration, mode: DurationMode) -> FrameDuration {
        match mode {
            DurationMode::Clamp => {
                let minimum = duration.minimum.clamp(self.minimum, self.maximum);
                let maximum = duration.maximum.clamp(minimum, self.maximum);
                FrameDuration::new(minimum, maximum)
            }
            DurationMode::Uniform => FrameDuration::new(self.minimum, self.maximum),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    /// Pull each phase into the bounds.
    #[default]
    Clamp,
    /// Set every phase to exactly the bounds.
    Uniform,
}

/// Bounds per category; categories without bounds are left alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationSettings {
    pub items: Option<DurationBounds>,
    pub outfits: Option<DurationBounds>,
    pub effects: Option<DurationBounds>,
    pub missiles: Option<DurationBounds>,
    pub mode: DurationMode,
}

impl DurationSettings {
    pub fn bounds(&self, category: ThingCategory) -> Option<DurationBounds> {
        match category {
            ThingCategory::Item => self.items,
            ThingCategory::Outfit => self.outfits,
            ThingCategory::Effect => self.effects,
            ThingCategory::Missile => self.missiles,
        }
    }

    pub fn with_bounds(mut self, category: ThingCategory, bounds: DurationBounds) -> Self {
        let slot = match category {
            ThingCategory::Item => &mut self.items,
            ThingCategory::Outfit => &mut self.outfits,
            ThingCategory::Effect => &mut self.effects,
            ThingCategory::Missile => &mut self.missiles,
        };
        *slot = Some(bounds);
        self
    }

    pub fn with_mode(mut self, mode: DurationMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DurationReport {
    /// Things whose durations changed, per category.
    pub changed: [usize; 4],
}

impl DurationReport {
    pub fn total(&self) -> usize {
        self.changed.iter().sum()
    }
}

/// Rewrites per-phase durations of animated frame groups.
pub struct DurationOptimizer<'a> {
    settings: DurationSettings,
    chunk: usize,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> DurationOptimizer<'a> {
    pub fn new(settings: DurationSettings, chunk: usize, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            settings,
            chunk: chunk.max(1),
            sink,
        }
    }

    pub fn run(&mut self, things: &mut ThingStore) -> OptimizeResult<DurationReport> {
        for category in ThingCategory::ALL {
            if let Some(b) = self.settings.bounds(category) {
                DurationBounds::new(b.minimum, b.maximum)?;
            }
        }

        let mode = self.settings.mode;
        let mut report = DurationReport::default();
        let mut reporter = Reporter::new(ProgressKind::OptimizeDurations, "", 0, self.chunk);
        for category in ThingCategory::ALL {
            let Some(bounds) = self.settings.bounds(category) else {
                continue;
            };
            reporter.restart(category.as_str(), things.count(category));
            let sink = &mut *self.sink;
            let changed = things.edit_things(category, |thing| {
                let changed = retime(thing, bounds, mode);
                reporter.advance(1, sink);
                changed
            });
            reporter.finish(self.sink);
            report.changed[category.index()] = changed;
        }

        info!(changed = report.total(), ?mode, "duration optimization complete");
        Ok(report)
    }
}

fn retime(thing: &mut Thing, bounds: DurationBounds, mode: DurationMode) -> bool {
    let mut changed = false;
    for group in thing.groups.values_mut() {
        let Some(animation) = group.animation.as_mut() else {
            continue;
        };
        for duration in &mut animation.durations {
            let next = bounds.apply(*duration, mode);
            if next != *duration {
                *duration = next;
                changed = true;
            }
        }
    }
    changed
}
