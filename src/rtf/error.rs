//! Recoverable diagnostics reported while reading an RTF document.
//!
//! Nothing in here aborts a conversion. The lexer and parser record a
//! [`Diagnostic`] and carry on; the collected list is returned next to the
//! output so callers can decide how much damage they tolerate.

use std::fmt;

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Input violates RTF syntax (unbalanced braces, bad escapes, truncation)
    MalformedInput,
    /// Input is well formed but uses something this converter cannot honour
    UnsupportedConstruct,
    /// Text could not be moved between encodings without loss
    EncodingError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedInput => write!(f, "malformed input"),
            DiagnosticKind::UnsupportedConstruct => write!(f, "unsupported construct"),
            DiagnosticKind::EncodingError => write!(f, "encoding error"),
        }
    }
}

/// Location of a diagnostic in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from the start of the input
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
}

impl Position {
    /// Compute the position of `offset` within `input`.
    pub fn locate(input: &[u8], offset: usize) -> Self {
        LineCursor::default().locate(input, offset)
    }
}

/// Last resolved (offset, line) pair.
///
/// Lookups only scan the bytes between the previous offset and the new one,
/// so resolving offsets that arrive in roughly ascending order stays linear
/// in the input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineCursor {
    offset: usize,
    line: usize,
}

impl Default for LineCursor {
    fn default() -> Self {
        Self { offset: 0, line: 1 }
    }
}

impl LineCursor {
    pub(crate) fn locate(&mut self, input: &[u8], offset: usize) -> Position {
        let end = offset.min(input.len());
        if end >= self.offset {
            self.line += memchr::memchr_iter(b'\n', &input[self.offset..end]).count();
        } else {
            self.line -= memchr::memchr_iter(b'\n', &input[end..self.offset]).count();
        }
        self.offset = end;
        Position {
            offset,
            line: self.line,
        }
    }
}

/// A recoverable problem together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,
    /// Where it went wrong, if it can be tied to the input
    pub position: Option<Position>,
    /// Human-readable detail
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic without a position.
    #[inline]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            position: None,
            message: message.into(),
        }
    }

    /// Attach a position.
    #[inline]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(
                f,
                "{} at line {} (byte {}): {}",
                self.kind, pos.line, pos.offset, self.message
            ),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Collects diagnostics for one document, resolving byte offsets to lines.
#[derive(Debug)]
pub(crate) struct DiagnosticSink<'a> {
    input: &'a [u8],
    cursor: LineCursor,
    entries: Vec<Diagnostic>,
}

impl<'a> DiagnosticSink<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            cursor: LineCursor::default(),
            entries: Vec::new(),
        }
    }

    /// Record a diagnostic at a byte offset.
    pub(crate) fn report(&mut self, kind: DiagnosticKind, offset: usize, message: impl Into<String>) {
        let position = self.cursor.locate(self.input, offset);
        let diagnostic = Diagnostic::new(kind, message).at(position);
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub(crate) fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_counts_lines() {
        let input = b"{\\rtf1\nline two\nline three}";
        assert_eq!(Position::locate(input, 0).line, 1);
        assert_eq!(Position::locate(input, 8).line, 2);
        assert_eq!(Position::locate(input, input.len()).line, 3);
        // Offsets past the end clamp instead of panicking
        assert_eq!(Position::locate(input, 1000).line, 3);
    }

    #[test]
    fn test_cursor_moves_both_ways() {
        let input = b"a\nb\nc\nd";
        let mut cursor = LineCursor::default();
        assert_eq!(cursor.locate(input, 4).line, 3);
        assert_eq!(cursor.locate(input, 6).line, 4);
        assert_eq!(cursor.locate(input, 2).line, 2);
        assert_eq!(cursor.locate(input, 0).line, 1);
        assert_eq!(cursor.locate(input, 100), Position { offset: 100, line: 4 });
        for offset in 0..input.len() {
            assert_eq!(cursor.locate(input, offset), Position::locate(input, offset));
        }
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::new(DiagnosticKind::MalformedInput, "unbalanced group")
            .at(Position { offset: 12, line: 2 });
        assert_eq!(
            diag.to_string(),
            "malformed input at line 2 (byte 12): unbalanced group"
        );

        let diag = Diagnostic::new(DiagnosticKind::EncodingError, "lossy");
        assert_eq!(diag.to_string(), "encoding error: lossy");
    }

    #[test]
    fn test_sink_records_in_order() {
        let mut sink = DiagnosticSink::new(b"ab\ncd");
        sink.report(DiagnosticKind::MalformedInput, 4, "first");
        sink.extend([Diagnostic::new(DiagnosticKind::UnsupportedConstruct, "second")]);
        let entries = sink.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].position, Some(Position { offset: 4, line: 2 }));
        assert_eq!(entries[1].position, None);
    }
}
