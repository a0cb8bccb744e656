//! Unified error types for the converter.
//!
//! Only conditions that abort a conversion live here. Recoverable problems
//! found while reading a document are reported as
//! [`Diagnostic`](crate::rtf::Diagnostic) values next to the output instead.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Error, Result};
