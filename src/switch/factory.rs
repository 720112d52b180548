//! Switch creation.

use super::config::{SwitchConfig, build_config};
use super::handle::SwitchHandle;
use super::hooks::CreateHooks;
use super::instance::Switch;
use crate::error::{Result, SwitchError};
use crate::native::SwitchEngine;
use crate::thing::ThingRegistry;
use log::{error, info};
use std::sync::Arc;

/// Creates switches on an engine and runs creation hooks for each.
///
/// The factory owns the hook list and the identity registry; the registry
/// is attached as the first creation hook.
pub struct SwitchFactory {
    engine: Arc<dyn SwitchEngine>,
    registry: Arc<ThingRegistry>,
    hooks: CreateHooks,
}

impl SwitchFactory {
    pub fn new(engine: Arc<dyn SwitchEngine>) -> Self {
        let registry = Arc::new(ThingRegistry::new());
        let hooks = CreateHooks::new();

        let things = registry.clone();
        hooks.subscribe(move |switch: &Switch| {
            things.register(switch.info());
            Ok(())
        });

        Self {
            engine,
            registry,
            hooks,
        }
    }

    pub fn engine(&self) -> &Arc<dyn SwitchEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<ThingRegistry> {
        &self.registry
    }

    /// Subscribe `hook` to every future `create`. Hooks run in subscription
    /// order; there is no unsubscribe.
    pub fn on_create_subscribe<F>(&self, hook: F)
    where
        F: Fn(&Switch) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.subscribe(hook);
    }

    /// Create the switch `id`.
    ///
    /// A hook error aborts the remaining hooks and is returned; the switch
    /// built so far is dropped, which releases its handle.
    pub fn create(&self, id: &str, cfg: Option<SwitchConfig>) -> Result<Switch> {
        let block = build_config(cfg.as_ref());
        let Some(handle) = self.engine.create_handle(id, block) else {
            error!("Failed to create switch '{}'", id);
            return Err(SwitchError::AllocationFailed(id.to_string()));
        };

        let switch = Switch::new(
            SwitchHandle::new(self.engine.clone(), handle),
            id,
            self.registry.clone(),
        );
        self.hooks.fire(&switch)?;

        info!("Created switch '{}' ({})", id, handle);
        Ok(switch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{Action, NativeConfig, RESULT_ERROR, SoftEngine};
    use crate::switch::{StateEvent, StateValue};
    use crate::testing::{Call, RecordingEngine};
    use parking_lot::Mutex;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn recording() -> (Arc<RecordingEngine>, SwitchFactory) {
        let engine = Arc::new(RecordingEngine::new());
        let factory = SwitchFactory::new(engine.clone());
        (engine, factory)
    }

    #[test]
    fn test_create_passes_built_config() {
        let (engine, factory) = recording();
        let cfg = SwitchConfig {
            group_id: Some(3),
            ..Default::default()
        };

        factory.create("a", Some(cfg)).unwrap();
        factory.create("b", None).unwrap();

        let calls = engine.calls();
        assert_eq!(
            calls[0],
            Call::Create("a".into(), Some(NativeConfig::new(3, -1, false, -1)))
        );
        assert_eq!(calls[1], Call::Create("b".into(), None));
    }

    #[test]
    fn test_allocation_failure() {
        let (engine, factory) = recording();
        engine.fail_create(true);
        let hook_ran = Arc::new(AtomicBool::new(false));
        let h = hook_ran.clone();
        factory.on_create_subscribe(move |_| {
            h.store(true, Ordering::SeqCst);
            Ok(())
        });

        let err = factory.create("a", None).unwrap_err();
        assert!(matches!(err, SwitchError::AllocationFailed(id) if id == "a"));
        assert!(!hook_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hooks_run_once_in_order() {
        let (_engine, factory) = recording();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let s = seen.clone();
            factory.on_create_subscribe(move |switch: &Switch| {
                s.lock().push((tag, switch.id().to_string()));
                Ok(())
            });
        }

        // the registry hook is always subscribed first
        assert!(!factory.hooks.is_empty());
        assert_eq!(factory.hooks.len(), 3);
        factory.create("sw1", None).unwrap();
        assert_eq!(
            *seen.lock(),
            vec![("first", "sw1".to_string()), ("second", "sw1".to_string())]
        );
    }

    #[test]
    fn test_hook_failure_propagates_and_releases() {
        let (engine, factory) = recording();
        let later_ran = Arc::new(AtomicBool::new(false));
        factory.on_create_subscribe(|switch: &Switch| {
            Err(SwitchError::HookFailed {
                id: switch.id().to_string(),
                reason: "rejected".into(),
            })
        });
        let l = later_ran.clone();
        factory.on_create_subscribe(move |_| {
            l.store(true, Ordering::SeqCst);
            Ok(())
        });

        let err = factory.create("a", None).unwrap_err();
        assert!(matches!(err, SwitchError::HookFailed { .. }));
        assert!(!later_ran.load(Ordering::SeqCst));
        assert_eq!(engine.closed().len(), 1);
        assert!(factory.registry().find("a").is_none());
    }

    #[test]
    fn test_registry_resolves_created_switch() {
        let (_engine, factory) = recording();
        let sw = factory.create("a", None).unwrap();

        let info = factory.registry().resolve(sw.handle_id()).unwrap();
        assert_eq!(info.id(), "a");

        let handle = sw.handle_id();
        sw.close();
        assert!(factory.registry().resolve(handle).is_none());
    }

    #[test]
    fn test_get_event_written_back_through_engine() {
        let (engine, factory) = recording();
        let sw = factory.create("a", None).unwrap();
        let thing = Arc::new(Mutex::new(None));
        let t = thing.clone();
        sw.set_state_handler(
            move |act: Action, s: &mut StateEvent, _: &()| {
                *t.lock() = s.thing.as_ref().map(|i| i.id().to_string());
                if act == Action::Get {
                    s.value = StateValue::Bool(true);
                }
                true
            },
            (),
        );

        assert_eq!(engine.fire(sw.handle_id(), Action::Get, 0), Some((true, 1)));
        assert_eq!(engine.fire(sw.handle_id(), Action::Set, 0), Some((true, 0)));
        assert_eq!(thing.lock().as_deref(), Some("a"));
    }

    #[test]
    fn test_end_to_end_with_soft_engine() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine.clone());
        let relay = Arc::new(AtomicBool::new(false));

        let sw = factory.create("pump", None).unwrap();
        assert_eq!(factory.engine().state_get(sw.handle_id()), RESULT_ERROR);
        assert_eq!(sw.get_state(), StateValue::Other(-1));

        sw.set_state_handler(
            |act: Action, s: &mut StateEvent, relay: &Arc<AtomicBool>| {
                match act {
                    Action::Get => s.value = relay.load(Ordering::SeqCst).into(),
                    Action::Set => relay.store(s.value.is_on(), Ordering::SeqCst),
                }
                true
            },
            relay.clone(),
        );

        assert_eq!(sw.get_state(), StateValue::Bool(false));
        assert!(sw.set_state(true));
        assert!(relay.load(Ordering::SeqCst));
        assert_eq!(sw.toggle_state(), StateValue::Bool(false));
        assert!(!relay.load(Ordering::SeqCst));

        sw.reset_state_handler();
        assert!(!sw.set_state(true));
        assert!(!relay.load(Ordering::SeqCst));

        sw.close();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_closed_handle_does_not_answer() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine.clone());
        let sw = factory.create("a", None).unwrap();
        sw.set_state_handler(|_: Action, _: &mut StateEvent, _: &()| true, ());
        let handle = sw.handle_id();

        sw.close();
        assert!(!engine.state_set(handle, true));
        assert_eq!(
            StateValue::decode(engine.state_get(handle)),
            StateValue::Other(RESULT_ERROR)
        );
    }

    #[test]
    fn test_close_releases_switch_owned_by_handler() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine.clone());
        let master = factory.create("master", None).unwrap();
        let child = factory.create("child", None).unwrap();

        assert!(master.set_state_handler(
            |act: Action, s: &mut StateEvent, child: &Switch| {
                if act == Action::Get {
                    s.value = child.get_state();
                }
                true
            },
            child,
        ));

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            master.close();
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(engine.is_empty());
        assert!(factory.registry().find("child").is_none());
    }

    #[test]
    fn test_replaced_handler_releases_owned_switch() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine.clone());
        let master = factory.create("master", None).unwrap();
        let child = factory.create("child", None).unwrap();

        master.set_state_handler(|_: Action, _: &mut StateEvent, _: &Switch| true, child);
        master.set_state_handler(|_: Action, _: &mut StateEvent, _: &()| true, ());

        assert_eq!(engine.len(), 1);
        assert!(engine.has_handler(master.handle_id()));
    }

    #[test]
    #[should_panic(expected = "relay offline")]
    fn test_handler_panic_propagates() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine);
        let sw = factory.create("pump", None).unwrap();
        sw.set_state_handler(
            |_: Action, _: &mut StateEvent, _: &()| -> bool { panic!("relay offline") },
            (),
        );

        sw.get_state();
    }

    #[test]
    fn test_engine_usable_after_handler_panic() {
        let engine = Arc::new(SoftEngine::new().with_settle(|_| {}));
        let factory = SwitchFactory::new(engine.clone());
        let faulty = factory.create("faulty", None).unwrap();
        let healthy = factory.create("healthy", None).unwrap();
        faulty.set_state_handler(
            |_: Action, _: &mut StateEvent, _: &()| -> bool { panic!("relay offline") },
            (),
        );
        healthy.set_state_handler(
            |act: Action, s: &mut StateEvent, _: &()| {
                if act == Action::Get {
                    s.value = StateValue::Bool(true);
                }
                true
            },
            (),
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| faulty.get_state()));
        assert!(result.is_err());

        assert_eq!(engine.state_get(healthy.handle_id()), 1);
        assert_eq!(healthy.get_state(), StateValue::Bool(true));
        assert_eq!(engine.len(), 2);
    }
}
