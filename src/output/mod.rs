//! Output side of a conversion.
//!
//! Format descriptions are read into [`FormatTemplate`]s, collected per
//! [`TargetFormat`] in a [`TemplateSet`], and applied to a parsed document
//! by [`render`].

pub mod config;
mod format;
mod template;
mod writer;

pub use config::ConfigError;
pub use format::{TargetFormat, TemplateSet, TemplateSource, check_builtin};
pub use template::{DEFAULT_REPLACEMENT, FormatTemplate, Literal, REQUIRED_KEYS, TemplateKey};
pub use writer::{Rendered, render};
