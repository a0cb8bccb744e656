//! RTF lexer/tokenizer.
//!
//! The lexer works directly on the raw input bytes and never allocates for
//! tokens: control-word names, text runs and binary payloads all borrow from
//! the input. Text bytes are left undecoded because their codepage depends on
//! the font active at the point of use, which only the parser knows.

use super::error::{Diagnostic, DiagnosticKind, LineCursor};
use crate::common::encoding::hex_nibble;

/// Longest control-word name RTF allows.
pub const MAX_WORD_LEN: usize = 32;

/// Longest numeric parameter RTF allows, in digits.
pub const MAX_PARAM_DIGITS: usize = 10;

/// Lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{`
    GroupOpen,
    /// `}`
    GroupClose,
    /// `\name` or `\nameN`
    ControlWord {
        /// Letters of the word, at most [`MAX_WORD_LEN`] of them
        name: &'a str,
        /// Signed numeric parameter, clamped to the `i32` range
        param: Option<i32>,
    },
    /// `\` followed by a single non-letter. A backslash before a line end is
    /// reported as `b'\n'`.
    ControlSymbol(u8),
    /// A `\'xx` escape
    HexByte(u8),
    /// Run of literal bytes with line ends removed
    Text(&'a [u8]),
    /// Raw payload of `\binN`
    Binary(&'a [u8]),
    /// End of input
    Eof,
}

/// A token together with the byte offset where it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    /// The token
    pub token: Token<'a>,
    /// Byte offset of the token's first byte
    pub offset: usize,
}

/// Restartable RTF tokenizer.
///
/// Yields every token of the input followed by exactly one [`Token::Eof`];
/// after that the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    finished: bool,
    lines: LineCursor,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `input`.
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            finished: false,
            lines: LineCursor::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Rewind to the start of the input and forget collected diagnostics.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.finished = false;
        self.lines = LineCursor::default();
        self.diagnostics.clear();
    }

    /// Hand over the diagnostics collected since the last call.
    #[inline]
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Whether diagnostics are waiting to be taken.
    #[inline]
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn report(&mut self, kind: DiagnosticKind, offset: usize, message: impl Into<String>) {
        let position = self.lines.locate(self.input, offset);
        let diagnostic = Diagnostic::new(kind, message).at(position);
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn next_token(&mut self) -> Option<Spanned<'a>> {
        loop {
            let start = self.pos;
            let Some(&byte) = self.input.get(start) else {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Spanned {
                    token: Token::Eof,
                    offset: self.input.len(),
                });
            };

            let token = match byte {
                b'{' => {
                    self.pos += 1;
                    Some(Token::GroupOpen)
                },
                b'}' => {
                    self.pos += 1;
                    Some(Token::GroupClose)
                },
                b'\\' => self.lex_escape(),
                b'\r' | b'\n' => {
                    self.pos += 1;
                    None
                },
                _ => Some(self.lex_text()),
            };

            if let Some(token) = token {
                return Some(Spanned {
                    token,
                    offset: start,
                });
            }
        }
    }

    /// Lex whatever follows a backslash. Returns `None` when the escape is
    /// dropped.
    fn lex_escape(&mut self) -> Option<Token<'a>> {
        let start = self.pos;
        self.pos += 1;

        let Some(&next) = self.input.get(self.pos) else {
            self.report(DiagnosticKind::MalformedInput, start, "backslash at end of input");
            return None;
        };

        match next {
            b'a'..=b'z' | b'A'..=b'Z' => Some(self.lex_control_word(start)),
            b'\'' => {
                self.pos += 1;
                self.lex_hex_byte(start)
            },
            b'\r' | b'\n' => {
                self.pos += 1;
                Some(Token::ControlSymbol(b'\n'))
            },
            _ => {
                self.pos += 1;
                Some(Token::ControlSymbol(next))
            },
        }
    }

    fn lex_control_word(&mut self, start: usize) -> Token<'a> {
        let name_start = self.pos;
        while self
            .input
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphabetic())
        {
            self.pos += 1;
        }

        let mut name_end = self.pos;
        if name_end - name_start > MAX_WORD_LEN {
            self.report(
                DiagnosticKind::MalformedInput,
                start,
                format!("control word longer than {} letters", MAX_WORD_LEN),
            );
            name_end = name_start + MAX_WORD_LEN;
        }

        // SAFETY: the range only holds ASCII letters
        let name = unsafe { std::str::from_utf8_unchecked(&self.input[name_start..name_end]) };
        let param = self.lex_parameter(start);

        // A single space delimits the word and belongs to it
        if self.input.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }

        if name == "bin" {
            return self.lex_binary(start, param);
        }

        Token::ControlWord { name, param }
    }

    fn lex_parameter(&mut self, start: usize) -> Option<i32> {
        let negative = self.input.get(self.pos) == Some(&b'-');
        let digits_start = self.pos + usize::from(negative);
        if !self
            .input
            .get(digits_start)
            .is_some_and(|b| b.is_ascii_digit())
        {
            return None;
        }

        let mut end = digits_start;
        while self.input.get(end).is_some_and(|b| b.is_ascii_digit()) {
            end += 1;
        }
        self.pos = end;

        let digits = &self.input[digits_start..end];
        let magnitude = if digits.len() > MAX_PARAM_DIGITS {
            None
        } else {
            atoi_simd::parse::<u64, false, false>(digits).ok()
        };

        let value = magnitude.and_then(|m| {
            let signed = if negative { -(m as i64) } else { m as i64 };
            i32::try_from(signed).ok()
        });

        match value {
            Some(value) => Some(value),
            None => {
                self.report(
                    DiagnosticKind::MalformedInput,
                    start,
                    "numeric parameter out of range, clamped",
                );
                Some(if negative { i32::MIN } else { i32::MAX })
            },
        }
    }

    fn lex_binary(&mut self, start: usize, param: Option<i32>) -> Token<'a> {
        let requested = match param {
            Some(n) if n >= 0 => n as usize,
            Some(_) => {
                self.report(DiagnosticKind::MalformedInput, start, "negative \\bin length");
                0
            },
            None => 0,
        };

        let available = self.input.len() - self.pos;
        let len = if requested > available {
            self.report(
                DiagnosticKind::MalformedInput,
                start,
                format!(
                    "truncated binary: expected {} bytes, found {}",
                    requested, available
                ),
            );
            available
        } else {
            requested
        };

        let payload = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Token::Binary(payload)
    }

    fn lex_hex_byte(&mut self, start: usize) -> Option<Token<'a>> {
        let high = self.input.get(self.pos).copied().and_then(hex_nibble);
        let low = self.input.get(self.pos + 1).copied().and_then(hex_nibble);

        match (high, low) {
            (Some(high), Some(low)) => {
                self.pos += 2;
                Some(Token::HexByte((high << 4) | low))
            },
            _ => {
                self.report(DiagnosticKind::MalformedInput, start, "invalid hex escape");
                None
            },
        }
    }

    fn lex_text(&mut self) -> Token<'a> {
        let start = self.pos;
        let rest = &self.input[start..];
        let special = memchr::memchr3(b'\\', b'{', b'}', rest).unwrap_or(rest.len());
        let end = memchr::memchr2(b'\r', b'\n', &rest[..special]).unwrap_or(special);

        self.pos = start + end;
        Token::Text(&rest[..end])
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole input, returning the tokens (ending with `Eof`) and the
/// diagnostics raised along the way.
pub fn tokenize(input: &[u8]) -> (Vec<Spanned<'_>>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(input);
    let tokens = lexer.by_ref().collect();
    (tokens, lexer.take_diagnostics())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token<'_>> {
        tokenize(input).0.into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_simple_tokenization() {
        let toks = tokens(br"{\rtf1\ansi Hello}");
        assert_eq!(
            toks,
            vec![
                Token::GroupOpen,
                Token::ControlWord {
                    name: "rtf",
                    param: Some(1)
                },
                Token::ControlWord {
                    name: "ansi",
                    param: None
                },
                Token::Text(b"Hello"),
                Token::GroupClose,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_offsets() {
        let (spanned, _) = tokenize(br"{\b x}");
        let offsets: Vec<usize> = spanned.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 1, 4, 5, 6]);
    }

    #[test]
    fn test_single_space_delimiter() {
        // Only the first space is consumed by the word
        let toks = tokens(br"\b  two");
        assert_eq!(toks[1], Token::Text(b" two"));
    }

    #[test]
    fn test_negative_parameter() {
        let toks = tokens(br"\u-3913?");
        assert_eq!(
            toks[0],
            Token::ControlWord {
                name: "u",
                param: Some(-3913)
            }
        );
        assert_eq!(toks[1], Token::Text(b"?"));
    }

    #[test]
    fn test_dash_without_digits_is_text() {
        let toks = tokens(br"\b-x");
        assert_eq!(
            toks[0],
            Token::ControlWord {
                name: "b",
                param: None
            }
        );
        assert_eq!(toks[1], Token::Text(b"-x"));
    }

    #[test]
    fn test_parameter_overflow_is_clamped() {
        let (spanned, diags) = tokenize(br"\fs99999999999 x");
        assert_eq!(
            spanned[0].token,
            Token::ControlWord {
                name: "fs",
                param: Some(i32::MAX)
            }
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MalformedInput);
    }

    #[test]
    fn test_control_symbols() {
        let toks = tokens(b"\\{\\}\\\\\\~\\*\\\r\n");
        assert_eq!(
            toks,
            vec![
                Token::ControlSymbol(b'{'),
                Token::ControlSymbol(b'}'),
                Token::ControlSymbol(b'\\'),
                Token::ControlSymbol(b'~'),
                Token::ControlSymbol(b'*'),
                Token::ControlSymbol(b'\n'),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_hex_escape() {
        let toks = tokens(br"caf\'e9!");
        assert_eq!(
            toks,
            vec![
                Token::Text(b"caf"),
                Token::HexByte(0xE9),
                Token::Text(b"!"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_invalid_hex_escape_is_dropped() {
        let (spanned, diags) = tokenize(br"a\'zzb");
        let toks: Vec<_> = spanned.into_iter().map(|s| s.token).collect();
        assert_eq!(
            toks,
            vec![Token::Text(b"a"), Token::Text(b"zzb"), Token::Eof]
        );
        assert_eq!(diags.len(), 1);

        let (_, diags) = tokenize(br"\'4");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_line_ends_are_ignored() {
        let toks = tokens(b"ab\r\ncd\n");
        assert_eq!(
            toks,
            vec![Token::Text(b"ab"), Token::Text(b"cd"), Token::Eof]
        );
    }

    #[test]
    fn test_binary_consumes_raw_bytes() {
        let toks = tokens(b"{\\bin4 \\{}x}rest}");
        assert_eq!(
            toks,
            vec![
                Token::GroupOpen,
                Token::Binary(b"\\{}x"),
                Token::GroupClose,
                Token::Text(b"rest"),
                Token::GroupClose,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_truncated_binary() {
        let (spanned, diags) = tokenize(b"\\bin10 abc");
        assert_eq!(spanned[0].token, Token::Binary(b"abc"));
        assert_eq!(spanned[1].token, Token::Eof);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("truncated binary"));
    }

    #[test]
    fn test_long_control_word_is_truncated() {
        let word = "a".repeat(40);
        let input = format!("\\{} x", word);
        let (spanned, diags) = tokenize(input.as_bytes());
        match spanned[0].token {
            Token::ControlWord { name, .. } => assert_eq!(name.len(), MAX_WORD_LEN),
            other => panic!("unexpected token {:?}", other),
        }
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_single_eof_then_none() {
        let mut lexer = Lexer::new(b"");
        assert_eq!(lexer.next().map(|s| s.token), Some(Token::Eof));
        assert_eq!(lexer.next(), None);
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_reset_and_clone_restart() {
        let mut lexer = Lexer::new(br"{\b x}");
        let snapshot = lexer.clone();
        let first: Vec<_> = lexer.by_ref().collect();
        lexer.reset();
        let second: Vec<_> = lexer.collect();
        let third: Vec<_> = snapshot.collect();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_trailing_backslash() {
        let (spanned, diags) = tokenize(b"ab\\");
        assert_eq!(spanned.len(), 2);
        assert_eq!(diags.len(), 1);
    }
}
