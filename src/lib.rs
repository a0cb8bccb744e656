//! unrtf - A Rust library for converting Rich Text Format documents
//!
//! RTF input is read into a stream of formatting-aware events and written
//! out through a format description: a small text file listing the literal
//! markup for every attribute change and structural element. Descriptions
//! for plain text, HTML, LaTeX, troff (mm macros) and VT100 terminals are
//! built in; any of them can be replaced by pointing the converter at a
//! configuration directory.
//!
//! # Features
//!
//! - **Tolerant reader**: malformed input produces [`Diagnostic`]s, not errors
//! - **Codepages**: `\ansicpg`, font charsets and `\'hh` escapes are decoded
//!   with `encoding_rs`; `\uN` with fallback skipping is honoured
//! - **Structure**: tables, footnotes, hyperlink fields, pictures
//! - **Document info**: title, author, dates and counts from `\info`
//!
//! # Example - Converting to HTML
//!
//! ```rust
//! use unrtf::{TargetFormat, convert};
//!
//! # fn main() -> Result<(), unrtf::Error> {
//! let rtf = br"{\rtf1\ansi{\info{\title Greeting}}Hello \b World\b0 !\par}";
//! let result = convert(rtf, TargetFormat::Html, false)?;
//!
//! let html = result.text();
//! assert!(html.contains("<title>Greeting</title>"));
//! assert!(html.contains("Hello <b>World</b>!"));
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Custom configuration
//!
//! ```no_run
//! use unrtf::{ConvertOptions, Converter, TargetFormat};
//!
//! # fn main() -> Result<(), unrtf::Error> {
//! let options = ConvertOptions::new()
//!     .with_config_dir("/usr/share/unrtf")
//!     .with_suppress_pictures(true);
//! let converter = Converter::new(options);
//!
//! let rtf = std::fs::read("letter.rtf")?;
//! let result = converter.convert(&rtf, TargetFormat::Latex)?;
//! for diagnostic in &result.diagnostics {
//!     eprintln!("warning: {}", diagnostic);
//! }
//! std::fs::write("letter.tex", &result.output)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting a parsed document
//!
//! ```rust
//! use unrtf::rtf::{CharFlags, RtfDocument, SemanticEvent};
//!
//! # fn main() -> Result<(), unrtf::Error> {
//! let doc = RtfDocument::parse(br"{\rtf1 plain {\b bold}}")?;
//! let bold: Vec<&str> = doc
//!     .events()
//!     .iter()
//!     .filter_map(|event| match event {
//!         SemanticEvent::TextRun { text, frame } if frame.flags.contains(CharFlags::BOLD) => Some(text.as_str()),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(bold, ["bold"]);
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod convert;
pub mod output;
pub mod rtf;

pub use common::{Error, Result};
pub use convert::{CONFIG_DIR_ENV, Conversion, ConvertOptions, Converter, convert};
pub use output::{TargetFormat, TemplateSet};
pub use rtf::{Diagnostic, DiagnosticKind, RtfDocument};
