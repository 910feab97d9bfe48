//! Foreign runtime capability surface.
//!
//! The embedded interpreter is natively implemented and reachable only
//! through the entry points below. scriptbox treats them as an opaque
//! capability set: it manages the lifecycle of instances and captures their
//! output, but never inspects interpreter internals or defines language
//! semantics.

use crate::config::types::InterpreterSettings;
use std::num::NonZeroUsize;

/// Opaque reference to one foreign interpreter instance.
///
/// Non-null by construction. Validity over time is tracked by the owning
/// handle's lifecycle state, not inferred from the reference itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineRef(NonZeroUsize);

impl EngineRef {
    /// Wrap a raw foreign reference; zero means the factory returned null.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(EngineRef)
    }

    /// Raw value for handing back to the foreign runtime
    pub fn raw(&self) -> usize {
        self.0.get()
    }
}

/// Entry points exposed by the native interpreter runtime.
///
/// Implementations wrap the actual foreign bindings; `StubEngine` in
/// [`crate::testing`] provides an in-process double for tests.
pub trait NativeEngine: Send + Sync {
    /// Engine name used in logs and error messages
    fn engine_name(&self) -> &str;

    /// Allocate a new interpreter instance. `None` means the foreign
    /// factory returned a null reference.
    fn create(&self) -> Option<EngineRef>;

    /// Invoke the foreign init entry point. Outcome is observed through
    /// [`NativeEngine::is_initialized`], not a return value.
    fn init(&self, instance: EngineRef, settings: &InterpreterSettings);

    /// Probe the foreign is-initialized flag
    fn is_initialized(&self, instance: EngineRef) -> bool;

    /// Run a snippet inside the instance; the flag reports whether the
    /// foreign runtime considers the execution successful.
    fn run_code(&self, instance: EngineRef, code: &str) -> bool;

    /// Foreign version accessor. `None` models a null reference.
    fn get_version(&self, instance: EngineRef) -> Option<String>;

    /// Invoke the foreign destructor
    fn destroy(&self, instance: EngineRef);

    /// True when the runtime supports only one live instance per process.
    /// The session manager then serializes handle creation process-wide.
    fn single_instance(&self) -> bool {
        false
    }
}
