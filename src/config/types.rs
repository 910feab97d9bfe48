/// Shared type definitions and closed enums for the scriptbox system
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Lifecycle state of an interpreter handle.
///
/// State only advances forward: `Created` -> `Initialized` -> `Destroyed`.
/// The session manager is the only writer; every other component reads the
/// state to validate preconditions before any foreign call is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleState {
    /// Allocated by the foreign factory, not yet initialized
    Created,
    /// Init entry point succeeded and the is-initialized probe confirmed it
    Initialized,
    /// Torn down (or failed init); no operation may ever run again
    Destroyed,
}

impl std::fmt::Display for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleState::Created => write!(f, "created"),
            HandleState::Initialized => write!(f, "initialized"),
            HandleState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Settings handed to the foreign init entry point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterpreterSettings {
    /// Program name reported to the embedded interpreter
    pub program_name: String,
    /// Extra module search paths made visible to interpreted code
    pub module_paths: Vec<PathBuf>,
    /// Environment variables exported into the interpreter
    pub environment: Vec<(String, String)>,
}

impl Default for InterpreterSettings {
    fn default() -> Self {
        Self {
            program_name: "scriptbox".to_string(),
            module_paths: Vec::new(),
            environment: Vec::new(),
        }
    }
}

/// Limits for one scoped capture session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureLimits {
    /// Maximum bytes retained from one capture (bytes past the limit are
    /// drained and discarded so the writer never blocks on a full pipe)
    pub max_bytes: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        CaptureLimits {
            max_bytes: 8 * 1024 * 1024, // 8 MB
        }
    }
}

/// Custom error types for scriptbox
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Interpreter allocation failed: {0}")]
    Resource(String),

    #[error("Interpreter initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid handle state: operation requires {required}, handle is {actual}")]
    InvalidHandle {
        required: HandleState,
        actual: HandleState,
    },

    #[error("Use after free: handle was already destroyed")]
    UseAfterFree,

    #[error("Code execution reported failure ({} bytes captured)", output.len())]
    Execution { output: Vec<u8> },

    #[error("Version accessor returned no version string")]
    VersionUnavailable,

    #[error("Capture IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture slot poisoned: stdout restoration failed: {0}")]
    CapturePoisoned(String),
}

impl From<nix::errno::Errno> for SessionError {
    fn from(err: nix::errno::Errno) -> Self {
        SessionError::Io(std::io::Error::from(err))
    }
}

/// Result type alias for scriptbox operations
pub type Result<T> = std::result::Result<T, SessionError>;
