//! Configuration and shared types
//!
//! Settings structs, closed enums, and the error taxonomy.

pub mod types;
