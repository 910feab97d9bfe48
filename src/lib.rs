//! scriptbox: lifecycle supervision for an embedded scripting interpreter
//!
//! A thin supervisor around a natively-implemented scripting engine: create
//! an opaque interpreter handle, initialize it, run snippets inside it,
//! probe its version, tear it down. A companion facility captures whatever
//! the interpreter writes to the process-wide stdout during a single call,
//! without corrupting unrelated output.
//!
//! # Architecture
//!
//! ## Foreign Surface ([`engine`])
//! - [`engine::NativeEngine`]: The opaque capability set of the native runtime
//! - [`engine::EngineRef`]: Non-null reference to one foreign instance
//!
//! ## Session Lifecycle ([`session`])
//! - [`session::manager`]: Create/init/destroy with forward-only state machine
//! - [`session::handle`]: Typed handle, per-handle serialization
//! - [`session::runner`]: Snippet execution with captured stdout
//! - [`session::version`]: Version introspection
//! - [`session::scope`]: Scope-owned session with destroy-on-drop
//!
//! ## Output Capture ([`capture`])
//! - [`capture::OutputCapture`]: Single-slot, lock-guarded stdout redirection
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Settings, limits, closed enums, error taxonomy
//!
//! ## Testing Infrastructure ([`testing`])
//! - [`testing::StubEngine`]: In-process double for the foreign surface
//!
//! # Design Principles
//!
//! 1. **Lifecycle before foreign calls** - Every operation validates the
//!    handle state machine before the native runtime is reached
//! 2. **Shared state is a guarded slot** - stdout redirection goes through
//!    one exclusive acquisition point, restored on every exit path
//! 3. **Typed errors at the boundary** - Foreign success flags and null
//!    references map immediately into the error taxonomy, never propagated raw
//! 4. **No retries** - Foreign-runtime state after a failure is not assumed
//!    to be safely retryable

// Foreign Surface
pub mod engine;

// Session Lifecycle
pub mod session;

// Output Capture
pub mod capture;

// Configuration
pub mod config;

// Testing Infrastructure
pub mod testing;

// Re-export commonly used types for convenience
pub use capture::OutputCapture;
pub use config::types::{
    CaptureLimits, HandleState, InterpreterSettings, Result, SessionError,
};
pub use engine::{EngineRef, NativeEngine};
pub use session::{CodeRunner, InterpreterHandle, Session, SessionManager, VersionProbe};
