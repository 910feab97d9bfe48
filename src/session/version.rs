//! Interpreter version introspection.

use crate::config::types::{HandleState, Result, SessionError};
use crate::session::handle::InterpreterHandle;

/// Queries an initialized handle for its version string
pub struct VersionProbe;

impl VersionProbe {
    /// Return the foreign runtime's version string as owned memory.
    ///
    /// Requires an initialized handle; any other state fails with
    /// `UseAfterFree` before the foreign accessor is reached. A null or
    /// empty foreign string fails with `VersionUnavailable`.
    pub fn get_version(handle: &InterpreterHandle) -> Result<String> {
        let guard = handle.lock();
        if guard.state != HandleState::Initialized {
            return Err(SessionError::UseAfterFree);
        }
        let native = guard.native.ok_or(SessionError::UseAfterFree)?;

        match handle.engine().get_version(native) {
            Some(version) if !version.is_empty() => Ok(version),
            _ => Err(SessionError::VersionUnavailable),
        }
    }
}
