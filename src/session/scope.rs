//! Scope-owned interpreter session.

use crate::config::types::{HandleState, InterpreterSettings, Result};
use crate::session::handle::InterpreterHandle;
use crate::session::manager::SessionManager;
use crate::session::runner::CodeRunner;
use crate::session::version::VersionProbe;

/// Create-and-init convenience that destroys the handle when dropped.
///
/// Callers that want explicit teardown (and its error) should use
/// [`SessionManager::destroy`] directly; the drop path only logs.
pub struct Session<'m> {
    manager: &'m SessionManager,
    handle: InterpreterHandle,
}

impl<'m> Session<'m> {
    /// Create a handle and initialize it in one step
    pub fn open(manager: &'m SessionManager, settings: &InterpreterSettings) -> Result<Self> {
        let handle = manager.create()?;
        manager.init(&handle, settings)?;
        Ok(Session { manager, handle })
    }

    pub fn handle(&self) -> &InterpreterHandle {
        &self.handle
    }

    /// See [`CodeRunner::run`]
    pub fn run(&self, code: &str) -> Result<Vec<u8>> {
        CodeRunner::run(&self.handle, code)
    }

    /// See [`VersionProbe::get_version`]
    pub fn version(&self) -> Result<String> {
        VersionProbe::get_version(&self.handle)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        // A failed init already moved the handle to Destroyed; skip teardown.
        if self.handle.state() == HandleState::Destroyed {
            return;
        }
        if let Err(err) = self.manager.destroy(&self.handle) {
            log::warn!(
                "failed to destroy interpreter handle {} on session drop: {}",
                self.handle.id(),
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{HandleState, SessionError};
    use crate::testing::StubEngine;
    use std::sync::Arc;

    #[test]
    fn test_session_open_initializes() {
        let manager = SessionManager::new(Arc::new(StubEngine::new()));
        let session = Session::open(&manager, &InterpreterSettings::default()).expect("open");
        assert_eq!(session.handle().state(), HandleState::Initialized);
    }

    #[test]
    fn test_session_drop_destroys_handle() {
        let engine = Arc::new(StubEngine::new());
        let manager = SessionManager::new(engine.clone());
        {
            let _session =
                Session::open(&manager, &InterpreterSettings::default()).expect("open");
            assert_eq!(engine.live_instances(), 1);
        }
        assert_eq!(engine.live_instances(), 0);
    }

    #[test]
    fn test_session_open_surfaces_init_failure() {
        let manager = SessionManager::new(Arc::new(StubEngine::failing_init()));
        assert!(matches!(
            Session::open(&manager, &InterpreterSettings::default()),
            Err(SessionError::Initialization(_))
        ));
    }
}
