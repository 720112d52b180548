//! Creation hooks run for every newly created switch.

use super::instance::Switch;
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Hook invoked once per created switch, before `create` returns it.
pub type CreateHook = Arc<dyn Fn(&Switch) -> Result<()> + Send + Sync>;

/// Append-only, ordered list of creation hooks.
#[derive(Default)]
pub struct CreateHooks {
    hooks: RwLock<Vec<CreateHook>>,
}

impl CreateHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, hook: F)
    where
        F: Fn(&Switch) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.write().push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every hook in subscription order. The first error stops the
    /// remaining hooks and is returned.
    pub fn fire(&self, switch: &Switch) -> Result<()> {
        // Snapshot so a hook may subscribe further hooks.
        let hooks: Vec<CreateHook> = self.hooks.read().clone();
        for hook in hooks {
            hook(switch)?;
        }
        Ok(())
    }
}
