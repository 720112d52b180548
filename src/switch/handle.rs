//! Owning wrapper around a native switch handle.

use crate::native::{HandleId, SwitchEngine};
use std::sync::Arc;

/// Exclusive owner of one native handle.
///
/// Not `Clone`: exactly one owner exists, and the native handle is released
/// exactly once when the owner is dropped.
pub struct SwitchHandle {
    engine: Arc<dyn SwitchEngine>,
    id: HandleId,
}

impl SwitchHandle {
    pub(crate) fn new(engine: Arc<dyn SwitchEngine>, id: HandleId) -> Self {
        Self { engine, id }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn engine(&self) -> &dyn SwitchEngine {
        self.engine.as_ref()
    }
}

impl Drop for SwitchHandle {
    fn drop(&mut self) {
        self.engine.close_handle(self.id);
    }
}

impl std::fmt::Debug for SwitchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SwitchHandle").field(&self.id).finish()
    }
}
