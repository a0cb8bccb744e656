//! RTF document representation.

use super::error::Diagnostic;
use super::event::{SemanticEvent, SpecialElement};
use super::info::DocumentInfo;
use super::parser::Parser;
use super::symbol::CharMap;
use super::types::{ColorTable, FontRef, FontTable};
use crate::common::error::Result;
use std::sync::Arc;

/// Nesting limit used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Parser settings.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Drop `\pict` groups without collecting their data
    pub suppress_pictures: bool,
    /// Deepest group nesting accepted before parsing fails
    pub max_depth: usize,
    /// Substitute for undecodable input bytes. `None` drops them.
    pub replacement: Option<char>,
    /// Mapping used for text in symbol fonts
    pub charmap: Arc<CharMap>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            suppress_pictures: false,
            max_depth: DEFAULT_MAX_DEPTH,
            replacement: Some('?'),
            charmap: CharMap::builtin(),
        }
    }
}

/// Group bookkeeping collected while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Groups opened
    pub pushes: usize,
    /// Groups closed, including those closed at end of input
    pub pops: usize,
    /// Deepest nesting reached
    pub max_depth: usize,
    /// Nesting left after parsing; always zero
    pub final_depth: usize,
}

/// A parsed RTF document.
///
/// Holds the semantic event stream together with the tables and metadata
/// read from the header. Problems found while parsing are kept as
/// [`Diagnostic`]s rather than failing the parse.
#[derive(Debug, Clone)]
pub struct RtfDocument {
    pub(crate) events: Vec<SemanticEvent>,
    pub(crate) fonts: FontTable,
    pub(crate) colors: ColorTable,
    pub(crate) info: DocumentInfo,
    pub(crate) default_font: FontRef,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) stats: FrameStats,
}

impl RtfDocument {
    /// Parse an RTF document with default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unrtf::rtf::RtfDocument;
    ///
    /// let doc = RtfDocument::parse(br"{\rtf1\ansi Hello \b World\b0 !}")?;
    /// assert_eq!(doc.text(), "Hello World!");
    /// # Ok::<(), unrtf::Error>(())
    /// ```
    pub fn parse(input: &[u8]) -> Result<Self> {
        Self::parse_with(input, &ParseOptions::default())
    }

    /// Parse an RTF document.
    ///
    /// Fails only when nesting exceeds [`ParseOptions::max_depth`].
    pub fn parse_with(input: &[u8], options: &ParseOptions) -> Result<Self> {
        Parser::new(input, options).parse()
    }

    /// The semantic event stream.
    #[inline]
    pub fn events(&self) -> &[SemanticEvent] {
        &self.events
    }

    #[inline]
    pub fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    #[inline]
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Metadata from the `\info` group.
    #[inline]
    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    /// Font selected by `\deff`.
    #[inline]
    pub fn default_font(&self) -> FontRef {
        self.default_font
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Plain text of the document.
    ///
    /// Hidden text is left out. Paragraph, line, page and section breaks
    /// become newlines and tabs stay tabs.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            match event {
                SemanticEvent::TextRun { text, frame } if !frame.is_hidden() => {
                    out.push_str(text)
                },
                SemanticEvent::Special(
                    SpecialElement::ParagraphBreak
                    | SpecialElement::LineBreak
                    | SpecialElement::PageBreak
                    | SpecialElement::SectionBreak,
                ) => out.push('\n'),
                SemanticEvent::Special(SpecialElement::Tab) => out.push('\t'),
                _ => {},
            }
        }
        out
    }
}
