//! Typed wrapper over one foreign interpreter instance.

use crate::config::types::{HandleState, Result, SessionError};
use crate::engine::{EngineRef, NativeEngine};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Mutable handle core: native reference plus lifecycle state.
///
/// The session manager is the only writer of `state`; the runner and the
/// version probe take the same lock read-only, so state transitions and
/// foreign calls on one handle never interleave.
#[derive(Debug)]
pub(crate) struct HandleInner {
    /// Opaque foreign reference; `Some` while the handle is live
    pub(crate) native: Option<EngineRef>,
    pub(crate) state: HandleState,
}

impl HandleInner {
    /// Validate that the handle is live in `required` state and return the
    /// native reference for a foreign call.
    ///
    /// `Destroyed` always maps to `UseAfterFree`; any other mismatch maps to
    /// `InvalidHandle`.
    pub(crate) fn require(&self, required: HandleState) -> Result<EngineRef> {
        match self.state {
            HandleState::Destroyed => Err(SessionError::UseAfterFree),
            actual if actual == required => self.native.ok_or(SessionError::UseAfterFree),
            actual => Err(SessionError::InvalidHandle { required, actual }),
        }
    }
}

/// Stateful wrapper around one instance of the foreign runtime.
///
/// Created by [`SessionManager::create`](crate::session::SessionManager::create)
/// and never reusable once destroyed.
pub struct InterpreterHandle {
    handle_id: Uuid,
    engine: Arc<dyn NativeEngine>,
    inner: Mutex<HandleInner>,
}

impl InterpreterHandle {
    pub(crate) fn new(engine: Arc<dyn NativeEngine>, native: EngineRef) -> Self {
        InterpreterHandle {
            handle_id: Uuid::new_v4(),
            engine,
            inner: Mutex::new(HandleInner {
                native: Some(native),
                state: HandleState::Created,
            }),
        }
    }

    /// Instance id for log correlation
    pub fn id(&self) -> Uuid {
        self.handle_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        self.lock().state
    }

    pub(crate) fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.engine
    }

    /// Per-handle serialization point: every operation locks here before
    /// touching state or the foreign runtime.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HandleInner> {
        // Foreign calls run while the lock is held, so a panicking engine
        // can poison it; the state machine itself stays consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for InterpreterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterHandle")
            .field("handle_id", &self.handle_id)
            .field("engine", &self.engine.engine_name())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(state: HandleState) -> HandleInner {
        HandleInner {
            native: if state == HandleState::Destroyed {
                None
            } else {
                EngineRef::new(1)
            },
            state,
        }
    }

    #[test]
    fn test_require_matching_state_yields_native_ref() {
        let i = inner(HandleState::Initialized);
        let native = i.require(HandleState::Initialized).expect("live handle");
        assert_eq!(native.raw(), 1);
    }

    #[test]
    fn test_require_on_destroyed_is_use_after_free() {
        let i = inner(HandleState::Destroyed);
        // Destroyed wins over any required state
        assert!(matches!(
            i.require(HandleState::Created),
            Err(SessionError::UseAfterFree)
        ));
        assert!(matches!(
            i.require(HandleState::Initialized),
            Err(SessionError::UseAfterFree)
        ));
    }

    #[test]
    fn test_require_wrong_live_state_is_invalid_handle() {
        let i = inner(HandleState::Created);
        match i.require(HandleState::Initialized) {
            Err(SessionError::InvalidHandle { required, actual }) => {
                assert_eq!(required, HandleState::Initialized);
                assert_eq!(actual, HandleState::Created);
            }
            other => panic!("expected InvalidHandle, got {:?}", other.map(|r| r.raw())),
        }
    }
}
