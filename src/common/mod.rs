//! Types and helpers shared by the reader and the output side.

pub mod encoding;
pub mod error;

pub use error::{Error, Result};
