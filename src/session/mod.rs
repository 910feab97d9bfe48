//! Interpreter session lifecycle and operations
//!
//! - [`handle`]: Typed, stateful wrapper over one foreign instance
//! - [`manager`]: Lifecycle supervision (create/init/destroy)
//! - [`runner`]: Snippet execution with scoped stdout capture
//! - [`version`]: Version introspection
//! - [`scope`]: Scope-owned create-and-init convenience

pub mod handle;
pub mod manager;
pub mod runner;
pub mod scope;
pub mod version;

pub use handle::InterpreterHandle;
pub use manager::SessionManager;
pub use runner::CodeRunner;
pub use scope::Session;
pub use version::VersionProbe;
