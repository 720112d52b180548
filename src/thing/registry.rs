use crate::native::HandleId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Identity of a live switch, shared with state events.
#[derive(Debug, PartialEq, Eq)]
pub struct SwitchInfo {
    id: String,
    handle: HandleId,
}

impl SwitchInfo {
    pub fn new(id: impl Into<String>, handle: HandleId) -> Self {
        Self {
            id: id.into(),
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }
}

/// Weak handle-to-switch lookup.
#[derive(Default)]
pub struct ThingRegistry {
    things: RwLock<HashMap<HandleId, Weak<SwitchInfo>>>,
}

impl ThingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `info`, dropping entries whose switch is gone.
    pub fn register(&self, info: &Arc<SwitchInfo>) {
        let mut things = self.things.write();
        things.retain(|_, thing| thing.strong_count() > 0);
        things.insert(info.handle(), Arc::downgrade(info));
    }

    /// Resolve the switch owning `handle`, if it is still alive.
    pub fn resolve(&self, handle: HandleId) -> Option<Arc<SwitchInfo>> {
        self.things.read().get(&handle).and_then(Weak::upgrade)
    }

    /// Find a live switch by id.
    pub fn find(&self, id: &str) -> Option<Arc<SwitchInfo>> {
        self.things
            .read()
            .values()
            .filter_map(Weak::upgrade)
            .find(|info| info.id() == id)
    }

    /// Number of live switches.
    pub fn len(&self) -> usize {
        self.things
            .read()
            .values()
            .filter(|thing| thing.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
