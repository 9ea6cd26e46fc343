//! Progress reporting for long passes.
//!
//! Passes run synchronously and report after each bounded chunk through a
//! caller-supplied [`ProgressSink`]; there is no global listener registry.

use serde::{Deserialize, Serialize};

/// Which pass a progress event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressKind {
    Load,
    Compile,
    Merge,
    OptimizeSprites,
    OptimizeDurations,
    ConvertFrameGroups,
}

/// One `{id, label, loaded, total}` notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub id: ProgressKind,
    pub label: String,
    pub loaded: usize,
    pub total: usize,
}

/// Receiver of progress events.
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// Collects events, mostly useful in tests.
impl ProgressSink for Vec<ProgressEvent> {
    fn report(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Adapts a closure into a sink.
pub struct ProgressFn<F>(pub F);

impl<F: FnMut(ProgressEvent)> ProgressSink for ProgressFn<F> {
    fn report(&mut self, event: ProgressEvent) {
        (self.0)(event)
    }
}

/// Counts work items and emits an event each time a chunk completes.
#[derive(Clone, Debug)]
pub struct Reporter {
    id: ProgressKind,
    label: String,
    total: usize,
    chunk: usize,
    loaded: usize,
    last_reported: usize,
}

impl Reporter {
    pub fn new(id: ProgressKind, label: impl Into<String>, total: usize, chunk: usize) -> Self {
        Self {
            id,
            label: label.into(),
            total,
            chunk: chunk.max(1),
            loaded: 0,
            last_reported: 0,
        }
    }

    /// Switch to a new step of the same pass, resetting the counters.
    pub fn restart(&mut self, label: impl Into<String>, total: usize) {
        self.label = label.into();
        self.total = total;
        self.loaded = 0;
        self.last_reported = 0;
    }

    /// Record `n` finished items, reporting once per completed chunk.
    pub fn advance(&mut self, n: usize, sink: &mut dyn ProgressSink) {
        self.loaded = (self.loaded + n).min(self.total);
        if self.loaded - self.last_reported >= self.chunk {
            self.emit(sink);
        }
    }

    /// Report the final position if it has not been reported yet.
    pub fn finish(&mut self, sink: &mut dyn ProgressSink) {
        self.loaded = self.total;
        if self.last_reported != self.loaded || self.total == 0 {
            self.emit(sink);
        }
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    fn emit(&mut self, sink: &mut dyn ProgressSink) {
        self.last_reported = self.loaded;
        sink.report(ProgressEvent {
            id: self.id,
            label: self.label.clone(),
            loaded: self.loaded,
            total: self.total,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_chunk() {
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut reporter = Reporter::new(ProgressKind::Merge, "items", 10, 4);
        for _ in 0..10 {
            reporter.advance(1, &mut events);
        }
        reporter.finish(&mut events);
        let loaded: Vec<usize> = events.iter().map(|e| e.loaded).collect();
        assert_eq!(loaded, vec![4, 8, 10]);
        assert!(events.iter().all(|e| e.total == 10 && e.label == "items"));
    }

    #[test]
    fn finish_does_not_duplicate_last_chunk() {
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut reporter = Reporter::new(ProgressKind::Load, "sprites", 4, 2);
        reporter.advance(4, &mut events);
        reporter.finish(&mut events);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_pass_still_reports() {
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut reporter = Reporter::new(ProgressKind::OptimizeSprites, "hash", 0, 100);
        reporter.finish(&mut events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].total, 0);
    }

    #[test]
    fn closure_sink() {
        let mut count = 0;
        {
            let mut sink = ProgressFn(|_e: ProgressEvent| count += 1);
            let mut reporter = Reporter::new(ProgressKind::Compile, "x", 3, 1);
            reporter.advance(3, &mut sink);
        }
        assert_eq!(count, 1);
    }
}
