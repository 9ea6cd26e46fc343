use std::collections::VecDeque;
use std::path::PathBuf;

use forge_types::{ProgressEvent, ProgressSink, SpriteId, ThingCategory, ThingId};

/// What a mutation touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Things {
        category: ThingCategory,
        ids: Vec<ThingId>,
    },
    Sprites {
        ids: Vec<SpriteId>,
    },
    /// A store-wide pass rewrote ids; cached views should be rebuilt.
    All,
}

/// Events a host polls from a workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Loaded {
        version: u32,
        things: usize,
        sprites: SpriteId,
    },
    Changed(Change),
    Progress(ProgressEvent),
    Compiled {
        metadata: PathBuf,
        sprites: PathBuf,
    },
    Error(String),
    Unloaded,
}

/// FIFO of pending notifications. Doubles as the progress sink of long
/// passes.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<Notification>,
}

impl Notifications {
    pub fn push(&mut self, notification: Notification) {
        self.queue.push_back(notification);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }
}

impl ProgressSink for Notifications {
    fn report(&mut self, event: ProgressEvent) {
        self.push(Notification::Progress(event));
    }
}
