//! Snippet execution with scoped stdout capture.

use crate::capture::OutputCapture;
use crate::config::types::{HandleState, Result, SessionError};
use crate::session::handle::InterpreterHandle;

/// Executes code snippets against an initialized handle
pub struct CodeRunner;

impl CodeRunner {
    /// Run `code` on an initialized handle, returning everything the snippet
    /// wrote to the process-wide stdout. Nothing leaks to the real output.
    ///
    /// The lifecycle check happens before any foreign call and before any
    /// capture plumbing is built. The foreign success flag maps at the
    /// boundary to a typed result; on failure the bytes captured before the
    /// flag was inspected travel inside [`SessionError::Execution`] — output
    /// that already happened is diagnostic value, not something to discard.
    pub fn run(handle: &InterpreterHandle, code: &str) -> Result<Vec<u8>> {
        // Lock held across the foreign call: per-handle serialization.
        let guard = handle.lock();
        let native = guard.require(HandleState::Initialized)?;
        let engine = handle.engine();

        let (output, ok) = OutputCapture::scoped(|| engine.run_code(native, code))?;
        if ok {
            Ok(output)
        } else {
            log::warn!(
                "interpreter handle {} reported execution failure ({} bytes captured)",
                handle.id(),
                output.len()
            );
            Err(SessionError::Execution { output })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::InterpreterSettings;
    use crate::session::manager::SessionManager;
    use crate::testing::StubEngine;
    use std::sync::Arc;

    // Successful runs redirect fd 1 and are exercised one-per-binary under
    // tests/; the precondition paths below never reach the capture slot.

    #[test]
    fn test_run_on_created_handle_is_invalid_handle() {
        let engine = Arc::new(StubEngine::new());
        let manager = SessionManager::new(engine.clone());
        let handle = manager.create().expect("create");

        let calls_before = engine.foreign_calls();
        let err = CodeRunner::run(&handle, "emit nope").expect_err("must fail");
        assert!(matches!(err, SessionError::InvalidHandle { .. }));
        // No foreign call, no captured output
        assert_eq!(engine.foreign_calls(), calls_before);
    }

    #[test]
    fn test_run_on_destroyed_handle_is_use_after_free() {
        let engine = Arc::new(StubEngine::new());
        let manager = SessionManager::new(engine.clone());
        let handle = manager.create().expect("create");
        manager
            .init(&handle, &InterpreterSettings::default())
            .expect("init");
        manager.destroy(&handle).expect("destroy");

        let calls_before = engine.foreign_calls();
        assert!(matches!(
            CodeRunner::run(&handle, "emit nope"),
            Err(SessionError::UseAfterFree)
        ));
        assert_eq!(engine.foreign_calls(), calls_before);
    }
}
