//! Semantic events produced by the parser.
//!
//! The event stream is the only thing the output layer sees of a document:
//! formatted text runs, structural groups that must nest properly, and
//! standalone elements such as breaks and pictures.

use super::field::Field;
use super::picture::Picture;
use super::types::AttributeFrame;
use std::rc::Rc;

/// Structural container in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    Table,
    Row,
    Cell,
    Footnote,
    /// Hyperlink with its target
    Hyperlink(String),
}

/// Standalone element in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialElement {
    ParagraphBreak,
    LineBreak,
    PageBreak,
    SectionBreak,
    Tab,
    /// A field instruction. Its result follows as ordinary events.
    Field(Field),
    Picture(Picture),
    /// Automatic footnote number
    FootnoteMark(u32),
}

/// One item of the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticEvent {
    /// Text under a formatting snapshot
    TextRun {
        text: String,
        frame: Rc<AttributeFrame>,
    },
    EnterGroup(GroupKind),
    ExitGroup(GroupKind),
    Special(SpecialElement),
}

impl SemanticEvent {
    /// Text of a run, `None` for every other event.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SemanticEvent::TextRun { text, .. } => Some(text),
            _ => None,
        }
    }
}
