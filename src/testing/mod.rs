//! Testing infrastructure
//!
//! In-process doubles for the foreign runtime surface, so the full session
//! lifecycle and capture path can be exercised without a native library.

use crate::config::types::InterpreterSettings;
use crate::engine::{EngineRef, NativeEngine};
use crate::session::handle::InterpreterHandle;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct StubInstance {
    initialized: bool,
}

/// In-process fake interpreter.
///
/// Snippet grammar, just enough to drive the supervisor:
/// - `emit <text>` writes `<text>` to the process-wide stdout and succeeds
/// - `emit-fail <text>` writes `<text>`, then reports failure
/// - `fail` reports failure without writing
/// - `crash` panics inside the foreign call
/// - anything else succeeds silently
pub struct StubEngine {
    next_ref: AtomicUsize,
    instances: Mutex<HashMap<usize, StubInstance>>,
    refuse_allocation: bool,
    fail_init: bool,
    single_instance: bool,
    version: String,
    foreign_calls: AtomicUsize,
    /// True while a factory call is in flight (single-instance mode only)
    in_factory: AtomicBool,
    /// Latched when two factory calls were observed in flight at once
    factory_overlap: AtomicBool,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::with_version("stub 1.0.0")
    }

    pub fn with_version(version: &str) -> Self {
        StubEngine {
            next_ref: AtomicUsize::new(1),
            instances: Mutex::new(HashMap::new()),
            refuse_allocation: false,
            fail_init: false,
            single_instance: false,
            version: version.to_string(),
            foreign_calls: AtomicUsize::new(0),
            in_factory: AtomicBool::new(false),
            factory_overlap: AtomicBool::new(false),
        }
    }

    /// Factory always returns a null reference
    pub fn refusing_allocation() -> Self {
        StubEngine {
            refuse_allocation: true,
            ..Self::new()
        }
    }

    /// Init runs but the is-initialized probe stays false
    pub fn failing_init() -> Self {
        StubEngine {
            fail_init: true,
            ..Self::new()
        }
    }

    /// Runtime that supports only one live instance per process; factory
    /// calls record whether they ever overlapped in time
    pub fn single_instance_runtime() -> Self {
        StubEngine {
            single_instance: true,
            ..Self::new()
        }
    }

    /// True if two factory calls were ever in flight simultaneously
    pub fn factory_overlap_observed(&self) -> bool {
        self.factory_overlap.load(Ordering::SeqCst)
    }

    /// Total foreign entry-point invocations observed
    pub fn foreign_calls(&self) -> usize {
        self.foreign_calls.load(Ordering::SeqCst)
    }

    /// Number of instances created and not yet destroyed
    pub fn live_instances(&self) -> usize {
        self.lock_instances().len()
    }

    /// Inspect the initialized flag of a handle's instance without going
    /// through (or counting as) a foreign call
    pub fn instance_initialized(&self, handle: &InterpreterHandle) -> bool {
        handle
            .lock()
            .native
            .map(|native| {
                self.lock_instances()
                    .get(&native.raw())
                    .map(|i| i.initialized)
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn lock_instances(&self) -> std::sync::MutexGuard<'_, HashMap<usize, StubInstance>> {
        self.instances.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn touch(&self) {
        self.foreign_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for StubEngine {
    fn engine_name(&self) -> &str {
        "stub"
    }

    fn create(&self) -> Option<EngineRef> {
        self.touch();
        if self.refuse_allocation {
            return None;
        }
        if self.single_instance {
            // Widen the race window so an unserialized caller is caught.
            if self.in_factory.swap(true, Ordering::SeqCst) {
                self.factory_overlap.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
            self.in_factory.store(false, Ordering::SeqCst);
        }
        let raw = self.next_ref.fetch_add(1, Ordering::SeqCst);
        self.lock_instances().insert(raw, StubInstance::default());
        EngineRef::new(raw)
    }

    fn init(&self, instance: EngineRef, _settings: &InterpreterSettings) {
        self.touch();
        if self.fail_init {
            return;
        }
        if let Some(inst) = self.lock_instances().get_mut(&instance.raw()) {
            inst.initialized = true;
        }
    }

    fn is_initialized(&self, instance: EngineRef) -> bool {
        self.touch();
        self.lock_instances()
            .get(&instance.raw())
            .map(|i| i.initialized)
            .unwrap_or(false)
    }

    fn run_code(&self, _instance: EngineRef, code: &str) -> bool {
        self.touch();
        // Write through the fd-backed stdout (not print!) so fd redirection
        // actually sees the bytes under the test harness.
        let mut out = std::io::stdout();
        if let Some(text) = code.strip_prefix("emit ") {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
            true
        } else if let Some(text) = code.strip_prefix("emit-fail ") {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
            false
        } else if code == "fail" {
            false
        } else if code == "crash" {
            panic!("stub interpreter crash");
        } else {
            true
        }
    }

    fn get_version(&self, _instance: EngineRef) -> Option<String> {
        self.touch();
        if self.version.is_empty() {
            None
        } else {
            Some(self.version.clone())
        }
    }

    fn destroy(&self, instance: EngineRef) {
        self.touch();
        self.lock_instances().remove(&instance.raw());
    }

    fn single_instance(&self) -> bool {
        self.single_instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_tracks_instances() {
        let engine = StubEngine::new();
        let a = engine.create().expect("ref a");
        let b = engine.create().expect("ref b");
        assert_ne!(a, b);
        assert_eq!(engine.live_instances(), 2);

        engine.destroy(a);
        assert_eq!(engine.live_instances(), 1);
        assert!(!engine.is_initialized(a));
    }

    #[test]
    fn test_stub_counts_foreign_calls() {
        let engine = StubEngine::new();
        let r = engine.create().expect("ref");
        engine.init(r, &InterpreterSettings::default());
        assert!(engine.is_initialized(r));
        assert_eq!(engine.foreign_calls(), 3);
    }

    #[test]
    fn test_stub_fail_statement_reports_failure_silently() {
        let engine = StubEngine::new();
        let r = engine.create().expect("ref");
        assert!(!engine.run_code(r, "fail"));
    }
}
