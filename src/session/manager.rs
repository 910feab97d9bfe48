//! Interpreter lifecycle supervision.
//!
//! The manager is the sole owner of handle state transitions. It enforces
//! the forward-only lifecycle (`Created` -> `Initialized` -> `Destroyed`)
//! at the entry of every operation, before any foreign call is made.

use crate::config::types::{HandleState, InterpreterSettings, Result, SessionError};
use crate::engine::NativeEngine;
use crate::session::handle::InterpreterHandle;
use std::sync::{Arc, Mutex};

/// Held across the foreign factory call when the runtime supports only one
/// live instance per process. The single-instance property belongs to the
/// runtime, not to any one manager, so the lock is process-wide: managers
/// sharing an engine must not overlap inside the factory either.
static SINGLE_INSTANCE_CREATE: Mutex<()> = Mutex::new(());

/// Creates, initializes, and destroys interpreter handles
pub struct SessionManager {
    engine: Arc<dyn NativeEngine>,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn NativeEngine>) -> Self {
        SessionManager { engine }
    }

    /// Allocate a fresh interpreter instance in state `Created`
    pub fn create(&self) -> Result<InterpreterHandle> {
        // Single-instance runtimes cannot tolerate concurrent factory calls.
        let _serial = self
            .engine
            .single_instance()
            .then(|| SINGLE_INSTANCE_CREATE.lock().unwrap_or_else(|e| e.into_inner()));

        let native = self.engine.create().ok_or_else(|| {
            SessionError::Resource(format!(
                "{} factory returned a null reference",
                self.engine.engine_name()
            ))
        })?;

        let handle = InterpreterHandle::new(Arc::clone(&self.engine), native);
        log::debug!(
            "created {} interpreter handle {}",
            self.engine.engine_name(),
            handle.id()
        );
        Ok(handle)
    }

    /// Initialize a freshly created handle.
    ///
    /// The foreign init entry point is invoked and the is-initialized flag
    /// probed immediately after. A false probe leaves the handle in a failed,
    /// non-reusable condition: the instance state is undefined, so the native
    /// reference is dropped without invoking the destructor and the handle is
    /// treated as destroyed.
    pub fn init(&self, handle: &InterpreterHandle, settings: &InterpreterSettings) -> Result<()> {
        let mut guard = handle.lock();
        let native = guard.require(HandleState::Created)?;

        self.engine.init(native, settings);
        if !self.engine.is_initialized(native) {
            guard.state = HandleState::Destroyed;
            guard.native = None;
            log::warn!(
                "interpreter handle {} failed the is-initialized probe",
                handle.id()
            );
            return Err(SessionError::Initialization(
                "init probe reported uninitialized".to_string(),
            ));
        }

        guard.state = HandleState::Initialized;
        log::debug!("interpreter handle {} initialized", handle.id());
        Ok(())
    }

    /// Tear down a handle from `Created` or `Initialized`.
    ///
    /// Any later `run`, `get_version`, or `destroy` on this handle fails
    /// with `UseAfterFree` before reaching the foreign runtime.
    pub fn destroy(&self, handle: &InterpreterHandle) -> Result<()> {
        let mut guard = handle.lock();
        if guard.state == HandleState::Destroyed {
            return Err(SessionError::UseAfterFree);
        }
        let native = guard.native.ok_or(SessionError::UseAfterFree)?;

        self.engine.destroy(native);
        guard.state = HandleState::Destroyed;
        guard.native = None;
        log::debug!("interpreter handle {} destroyed", handle.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEngine;

    fn manager(engine: StubEngine) -> (SessionManager, Arc<StubEngine>) {
        let engine = Arc::new(engine);
        (SessionManager::new(engine.clone()), engine)
    }

    #[test]
    fn test_create_yields_created_state() {
        let (manager, _) = manager(StubEngine::new());
        let handle = manager.create().expect("create");
        assert_eq!(handle.state(), HandleState::Created);
    }

    #[test]
    fn test_create_maps_null_factory_to_resource_error() {
        let (manager, engine) = manager(StubEngine::refusing_allocation());
        assert!(matches!(manager.create(), Err(SessionError::Resource(_))));
        assert_eq!(engine.foreign_calls(), 1); // the factory call itself
    }

    #[test]
    fn test_init_transitions_and_probe_reports_true() {
        let (manager, engine) = manager(StubEngine::new());
        let handle = manager.create().expect("create");
        manager
            .init(&handle, &InterpreterSettings::default())
            .expect("init");
        assert_eq!(handle.state(), HandleState::Initialized);
        assert!(engine.instance_initialized(&handle));
    }

    #[test]
    fn test_failed_init_probe_destroys_handle() {
        let (manager, _) = manager(StubEngine::failing_init());
        let handle = manager.create().expect("create");
        let err = manager
            .init(&handle, &InterpreterSettings::default())
            .expect_err("init must fail");
        assert!(matches!(err, SessionError::Initialization(_)));
        // Failed init is non-reusable: treated as destroyed for safety
        assert_eq!(handle.state(), HandleState::Destroyed);
        assert!(matches!(
            manager.init(&handle, &InterpreterSettings::default()),
            Err(SessionError::UseAfterFree)
        ));
    }

    #[test]
    fn test_init_twice_is_invalid_handle() {
        let (manager, _) = manager(StubEngine::new());
        let handle = manager.create().expect("create");
        manager
            .init(&handle, &InterpreterSettings::default())
            .expect("first init");
        assert!(matches!(
            manager.init(&handle, &InterpreterSettings::default()),
            Err(SessionError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn test_destroy_from_created_and_from_initialized() {
        let (manager, _) = manager(StubEngine::new());

        let fresh = manager.create().expect("create");
        manager.destroy(&fresh).expect("destroy from created");
        assert_eq!(fresh.state(), HandleState::Destroyed);

        let inited = manager.create().expect("create");
        manager
            .init(&inited, &InterpreterSettings::default())
            .expect("init");
        manager.destroy(&inited).expect("destroy from initialized");
        assert_eq!(inited.state(), HandleState::Destroyed);
    }

    #[test]
    fn test_double_destroy_is_use_after_free_without_foreign_call() {
        let (manager, engine) = manager(StubEngine::new());
        let handle = manager.create().expect("create");
        manager.destroy(&handle).expect("first destroy");

        let calls_before = engine.foreign_calls();
        assert!(matches!(
            manager.destroy(&handle),
            Err(SessionError::UseAfterFree)
        ));
        assert_eq!(engine.foreign_calls(), calls_before);
    }

    #[test]
    fn test_single_instance_create_serializes_across_managers() {
        // The single-instance constraint belongs to the runtime, so two
        // managers sharing one engine must not overlap inside the factory.
        let engine = Arc::new(StubEngine::single_instance_runtime());
        let manager_a = SessionManager::new(engine.clone());
        let manager_b = SessionManager::new(engine.clone());

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..4 {
                    manager_a.create().expect("create via manager a");
                }
            });
            scope.spawn(|| {
                for _ in 0..4 {
                    manager_b.create().expect("create via manager b");
                }
            });
        });

        assert!(
            !engine.factory_overlap_observed(),
            "factory calls on a single-instance runtime must be serialized process-wide"
        );
    }

    #[test]
    fn test_distinct_handles_are_independent() {
        let (manager, _) = manager(StubEngine::new());
        let a = manager.create().expect("create a");
        let b = manager.create().expect("create b");
        manager.destroy(&a).expect("destroy a");
        // b is untouched by a's teardown
        assert_eq!(b.state(), HandleState::Created);
        manager
            .init(&b, &InterpreterSettings::default())
            .expect("init b");
    }
}
