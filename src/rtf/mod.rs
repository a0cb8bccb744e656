//! RTF reader.
//!
//! Turns RTF bytes into a [`RtfDocument`]: a stream of [`SemanticEvent`]s
//! plus the font table, color table and document info read from the header.
//! Reading never fails on malformed content; problems are recorded as
//! [`Diagnostic`]s and parsing continues. Only runaway group nesting aborts
//! the parse.
//!
//! # Architecture
//!
//! - **Lexer**: splits the input into control words, control symbols, hex
//!   escapes, text and `\bin` payloads
//! - **Keyword table**: maps each control word to a parser action
//! - **Parser**: keeps the group stack and formatting frames, decodes text
//!   and emits events
//!
//! # Example
//!
//! ```rust
//! use unrtf::rtf::RtfDocument;
//!
//! let doc = RtfDocument::parse(br"{\rtf1\ansi{\fonttbl\f0\fswiss Helvetica;}\f0\pard Hello World!\par}")?;
//! assert_eq!(doc.text(), "Hello World!\n");
//! # Ok::<(), unrtf::Error>(())
//! ```

mod document;
mod error;
mod event;
mod field;
mod info;
pub mod keyword;
pub mod lexer;
mod parser;
mod picture;
mod symbol;
mod types;

pub use document::{DEFAULT_MAX_DEPTH, FrameStats, ParseOptions, RtfDocument};
pub use error::{Diagnostic, DiagnosticKind, Position};
pub use event::{GroupKind, SemanticEvent, SpecialElement};
pub use field::{Field, FieldType, SymbolField};
pub use info::{DateField, DatePart, DocumentInfo, InfoField, InfoNumber, RtfDateTime};
pub use lexer::{Lexer, Spanned, Token, tokenize};
pub use picture::{ImageType, Picture, PictureProp, detect_image_type};
pub use symbol::{CHARMAP_FILE, CharMap};
pub use types::{
    Alignment, AttributeFrame, CharFlags, Color, ColorRef, ColorTable, DEFAULT_FONT_SIZE, Font,
    FontFamily, FontRef, FontTable, UnderlineStyle,
};
