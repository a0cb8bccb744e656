//! RTF parser that turns tokens into semantic events.
//!
//! The parser keeps an explicit stack of groups instead of recursing, so
//! nesting depth is bounded by [`ParseOptions::max_depth`] and never by the
//! call stack. Each group holds a shared [`AttributeFrame`]; a frame is
//! copied only when a control word inside the group changes it.
//!
//! Text is collected into a pending run and decoded lazily, so multi-byte
//! characters written as consecutive `\'hh` escapes decode as a unit. The
//! run is emitted when the formatting changes or a structural event has to
//! be written.

use super::document::{FrameStats, ParseOptions, RtfDocument};
use super::error::{DiagnosticKind, DiagnosticSink};
use super::event::{GroupKind, SemanticEvent, SpecialElement};
use super::field::{Field, SymbolField};
use super::info::{DateField, DocumentInfo, InfoField, RtfDateTime};
use super::keyword::{self, Action, Destination, DocumentCharset, ParamKind};
use super::lexer::{Lexer, Spanned, Token};
use super::picture::PictureBuilder;
use super::types::{
    AttributeFrame, CharFlags, Color, ColorTable, Font, FontRef, FontTable, UnderlineStyle,
};
use crate::common::encoding::{
    DEFAULT_CODEPAGE, charset_to_codepage, codepage_to_encoding, decode_bytes,
};
use crate::common::error::{Error, Result};
use encoding_rs::Encoding;
use smallvec::SmallVec;
use std::rc::Rc;

/// Where the text of a group goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dest {
    /// Rendered document text
    Body,
    /// Dropped
    Suppressed,
    FontTable,
    ColorTable,
    /// Document info container; its own text is dropped
    Info,
    InfoText(InfoField),
    InfoDate(DateField),
    Picture,
    FieldInstruction,
}

/// Work to do when a group closes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Closer {
    None,
    InfoText(InfoField),
    InfoDate(DateField),
    Picture,
    FieldInstruction,
    Field,
    Hyperlink,
    Footnote,
}

#[derive(Debug)]
struct Group {
    frame: Rc<AttributeFrame>,
    dest: Dest,
    unicode_skip: usize,
    closer: Closer,
}

impl Group {
    fn child(&self) -> Self {
        Self {
            frame: Rc::clone(&self.frame),
            dest: self.dest,
            unicode_skip: self.unicode_skip,
            closer: Closer::None,
        }
    }
}

/// How raw bytes of the current font become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Codepage(&'static Encoding),
    Symbol,
}

/// Decoded text followed by bytes not yet decoded.
#[derive(Debug)]
struct TextBuffer {
    text: String,
    bytes: SmallVec<[u8; 64]>,
    source: Source,
}

impl TextBuffer {
    fn new(encoding: &'static Encoding) -> Self {
        Self {
            text: String::new(),
            bytes: SmallVec::new(),
            source: Source::Codepage(encoding),
        }
    }
}

/// Text collected under one frame, not yet emitted.
#[derive(Debug)]
struct PendingRun {
    frame: Rc<AttributeFrame>,
    buffer: TextBuffer,
    offset: usize,
}

#[derive(Debug, Default)]
struct FieldState {
    hyperlink: Option<String>,
    skip_result: bool,
}

#[derive(Debug)]
struct FontEntry {
    index: FontRef,
    font: Font,
    name: SmallVec<[u8; 32]>,
}

/// Decoding context shared by every text buffer.
struct Decoder<'o> {
    options: &'o ParseOptions,
}

impl Decoder<'_> {
    /// Decode pending bytes of `buffer` into its text.
    fn settle(&self, buffer: &mut TextBuffer, sink: &mut DiagnosticSink<'_>, offset: usize) {
        if buffer.bytes.is_empty() {
            return;
        }
        let replacement = self.options.replacement;
        match buffer.source {
            Source::Symbol => {
                let unmapped =
                    self.options
                        .charmap
                        .decode(&buffer.bytes, replacement, &mut buffer.text);
                if unmapped > 0 {
                    sink.report(
                        DiagnosticKind::EncodingError,
                        offset,
                        format!("{} symbol font code(s) have no mapping", unmapped),
                    );
                }
            },
            Source::Codepage(encoding) => match decode_bytes(&buffer.bytes, encoding, replacement) {
                Ok((text, replaced)) => {
                    buffer.text.push_str(&text);
                    if replaced {
                        sink.report(
                            DiagnosticKind::EncodingError,
                            offset,
                            format!("malformed {} text replaced", encoding.name()),
                        );
                    }
                },
                Err(err) => {
                    sink.report(
                        DiagnosticKind::EncodingError,
                        offset,
                        format!("{}; text dropped", err),
                    );
                },
            },
        }
        buffer.bytes.clear();
    }

    fn push_bytes(
        &self,
        buffer: &mut TextBuffer,
        source: Source,
        bytes: &[u8],
        sink: &mut DiagnosticSink<'_>,
        offset: usize,
    ) {
        if buffer.source != source {
            self.settle(buffer, sink, offset);
            buffer.source = source;
        }
        buffer.bytes.extend_from_slice(bytes);
    }

    fn push_str(
        &self,
        buffer: &mut TextBuffer,
        text: &str,
        sink: &mut DiagnosticSink<'_>,
        offset: usize,
    ) {
        self.settle(buffer, sink, offset);
        buffer.text.push_str(text);
    }
}

/// Single-pass RTF parser over one input.
pub(crate) struct Parser<'a, 'o> {
    lexer: Lexer<'a>,
    input_len: usize,
    decoder: Decoder<'o>,
    sink: DiagnosticSink<'a>,

    root: Group,
    stack: Vec<Group>,
    /// Open groups inside a skipped group, the skipped group included
    skip_depth: usize,
    ignorable: bool,
    fallback_skip: usize,
    high_surrogate: Option<(u32, usize)>,
    header_state: HeaderState,

    pending: Option<PendingRun>,
    events: Vec<SemanticEvent>,
    /// Groups entered in the event stream and not yet exited
    open: Vec<GroupKind>,

    fonts: FontTable,
    font_entry: Option<FontEntry>,
    colors: ColorTable,
    color_entry: Option<Color>,
    info: DocumentInfo,
    date: RtfDateTime,
    capture: TextBuffer,
    picture: Option<PictureBuilder>,
    fields: Vec<FieldState>,
    footnote_count: u32,
    footnote_depth: usize,

    default_font: FontRef,
    encoding: &'static Encoding,
    stats: FrameStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    Start,
    Opened,
    Done,
}

impl<'a, 'o> Parser<'a, 'o> {
    pub(crate) fn new(input: &'a [u8], options: &'o ParseOptions) -> Self {
        let encoding = encoding_rs::WINDOWS_1252;
        Self {
            lexer: Lexer::new(input),
            input_len: input.len(),
            decoder: Decoder { options },
            sink: DiagnosticSink::new(input),
            root: Group {
                frame: Rc::new(AttributeFrame::default()),
                dest: Dest::Body,
                unicode_skip: 1,
                closer: Closer::None,
            },
            stack: Vec::with_capacity(32),
            skip_depth: 0,
            ignorable: false,
            fallback_skip: 0,
            high_surrogate: None,
            header_state: HeaderState::Start,
            pending: None,
            events: Vec::new(),
            open: Vec::new(),
            fonts: FontTable::new(),
            font_entry: None,
            colors: ColorTable::new(),
            color_entry: None,
            info: DocumentInfo::new(),
            date: RtfDateTime::default(),
            capture: TextBuffer::new(encoding),
            picture: None,
            fields: Vec::new(),
            footnote_count: 0,
            footnote_depth: 0,
            default_font: 0,
            encoding,
            stats: FrameStats::default(),
        }
    }

    /// Parse the whole input.
    ///
    /// Only exceeding the nesting limit is fatal; every other problem is
    /// recorded as a diagnostic and parsing continues.
    pub(crate) fn parse(mut self) -> Result<RtfDocument> {
        while let Some(Spanned { token, offset }) = self.lexer.next() {
            if self.lexer.has_diagnostics() {
                let diagnostics = self.lexer.take_diagnostics();
                self.sink.extend(diagnostics);
            }
            self.check_header(&token, offset);

            match token {
                Token::Eof => break,
                Token::GroupOpen => self.open_group(offset)?,
                Token::GroupClose => self.close_brace(offset),
                _ if self.skip_depth > 0 => {},
                Token::ControlWord { name, param } => self.control_word(name, param, offset),
                Token::ControlSymbol(symbol) => self.control_symbol(symbol, offset),
                Token::HexByte(byte) => {
                    self.ignorable = false;
                    if !self.consume_fallback() {
                        self.push_bytes(&[byte], offset);
                    }
                },
                Token::Text(bytes) => self.text(bytes, offset),
                Token::Binary(payload) => self.binary(payload),
            }
        }

        Ok(self.finish())
    }

    fn check_header(&mut self, token: &Token<'_>, offset: usize) {
        self.header_state = match (self.header_state, token) {
            (HeaderState::Done, _) => return,
            (HeaderState::Start, Token::GroupOpen) => HeaderState::Opened,
            (HeaderState::Opened, Token::ControlWord { name: "rtf", .. }) => HeaderState::Done,
            _ => {
                self.sink.report(
                    DiagnosticKind::MalformedInput,
                    offset,
                    "input does not start with {\\rtf",
                );
                HeaderState::Done
            },
        };
    }

    #[inline]
    fn top(&self) -> &Group {
        self.stack.last().unwrap_or(&self.root)
    }

    #[inline]
    fn top_mut(&mut self) -> &mut Group {
        match self.stack.last_mut() {
            Some(group) => group,
            None => &mut self.root,
        }
    }

    #[inline]
    fn dest(&self) -> Dest {
        self.top().dest
    }

    #[inline]
    fn frame_mut(&mut self) -> &mut AttributeFrame {
        Rc::make_mut(&mut self.top_mut().frame)
    }

    // ---- Groups ----

    fn open_group(&mut self, offset: usize) -> Result<()> {
        self.ignorable = false;
        self.fallback_skip = 0;

        // A skipped group is already on the stack.
        let depth = self.stack.len() + self.skip_depth.saturating_sub(1) + 1;
        if depth > self.decoder.options.max_depth {
            return Err(Error::ResourceExhausted {
                limit: self.decoder.options.max_depth,
                offset,
            });
        }

        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }

        let child = self.top().child();
        self.stack.push(child);
        self.stats.pushes += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.stack.len());
        Ok(())
    }

    fn close_brace(&mut self, offset: usize) {
        self.ignorable = false;
        self.fallback_skip = 0;
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            if self.skip_depth > 0 {
                return;
            }
        }
        self.close_group(offset);
    }

    fn close_group(&mut self, offset: usize) {
        self.settle_surrogate();
        let Some(group) = self.stack.pop() else {
            self.sink.report(
                DiagnosticKind::MalformedInput,
                offset,
                "unbalanced closing brace",
            );
            return;
        };
        self.stats.pops += 1;

        match group.closer {
            Closer::None => {},
            Closer::InfoText(field) => {
                self.decoder.settle(&mut self.capture, &mut self.sink, offset);
                self.info.set_text(field, &self.capture.text);
            },
            Closer::InfoDate(field) => self.info.set_date(field, self.date),
            Closer::Picture => {
                if let Some(builder) = self.picture.take() {
                    self.emit_special(SpecialElement::Picture(builder.finish()), true);
                }
            },
            Closer::FieldInstruction => self.finish_field_instruction(offset),
            Closer::Field => {
                self.fields.pop();
            },
            Closer::Hyperlink => {
                self.flush_run();
                self.exit_until(|kind| matches!(kind, GroupKind::Hyperlink(_)));
            },
            Closer::Footnote => {
                self.flush_run();
                self.exit_until(|kind| *kind == GroupKind::Footnote);
                self.footnote_depth = self.footnote_depth.saturating_sub(1);
            },
        }

        if group.dest == Dest::FontTable {
            self.commit_font(offset);
        }
    }

    fn skip_group(&mut self) {
        self.skip_depth = 1;
    }

    fn enter(&mut self, kind: GroupKind) {
        self.events.push(SemanticEvent::EnterGroup(kind.clone()));
        self.open.push(kind);
    }

    fn exit_top(&mut self) {
        if let Some(kind) = self.open.pop() {
            self.events.push(SemanticEvent::ExitGroup(kind));
        }
    }

    /// Exit open groups up to and including the innermost one matching
    /// `target`. Nothing happens when no open group matches.
    fn exit_until(&mut self, target: impl Fn(&GroupKind) -> bool) {
        if !self.open.iter().any(&target) {
            return;
        }
        while let Some(kind) = self.open.pop() {
            let done = target(&kind);
            self.events.push(SemanticEvent::ExitGroup(kind));
            if done {
                break;
            }
        }
    }

    // ---- Tables ----

    /// Table nesting of the innermost open group, `None` when a footnote or
    /// hyperlink is innermost.
    fn table_level(&self) -> Option<usize> {
        match self.open.last() {
            None => Some(0),
            Some(GroupKind::Table) => Some(1),
            Some(GroupKind::Row) => Some(2),
            Some(GroupKind::Cell) => Some(3),
            Some(_) => None,
        }
    }

    fn open_cell_from(&mut self, level: usize) {
        const KINDS: [GroupKind; 3] = [GroupKind::Table, GroupKind::Row, GroupKind::Cell];
        for kind in KINDS.into_iter().skip(level) {
            self.enter(kind);
        }
    }

    /// Bring the open table structure in line with the current paragraph
    /// before visible content is written.
    fn sync_table(&mut self) {
        let Some(level) = self.table_level() else {
            return;
        };
        if self.top().frame.in_table {
            self.open_cell_from(level);
        } else {
            for _ in 0..level {
                self.exit_top();
            }
        }
    }

    fn end_cell(&mut self) {
        if self.dest() != Dest::Body {
            return;
        }
        self.flush_run();
        match self.table_level() {
            Some(level @ 1..=2) => self.open_cell_from(level),
            Some(0) if self.top().frame.in_table => self.open_cell_from(0),
            _ => {},
        }
        if self.open.last() == Some(&GroupKind::Cell) {
            self.exit_top();
        }
    }

    fn end_row(&mut self) {
        if self.dest() != Dest::Body {
            return;
        }
        self.flush_run();
        if self.open.last() == Some(&GroupKind::Cell) {
            self.exit_top();
        }
        if self.open.last() == Some(&GroupKind::Row) {
            self.exit_top();
        }
    }

    // ---- Text ----

    fn font_source(&self, font: FontRef) -> Source {
        match self.fonts.get(font) {
            Some(font) if font.is_symbol() => Source::Symbol,
            Some(font) => Source::Codepage(
                font.codepage
                    .or_else(|| font.charset.and_then(charset_to_codepage))
                    .and_then(codepage_to_encoding)
                    .unwrap_or(self.encoding),
            ),
            None => Source::Codepage(self.encoding),
        }
    }

    #[inline]
    fn current_source(&self) -> Source {
        self.font_source(self.top().frame.font)
    }

    /// Make sure a pending run exists for the current frame.
    fn begin_visible(&mut self, offset: usize) {
        let frame = &self.top().frame;
        let same = self
            .pending
            .as_ref()
            .is_some_and(|run| Rc::ptr_eq(&run.frame, frame) || run.frame == *frame);
        if same {
            return;
        }

        self.flush_run();
        self.sync_table();
        self.pending = Some(PendingRun {
            frame: Rc::clone(&self.top().frame),
            buffer: TextBuffer::new(self.encoding),
            offset,
        });
    }

    /// Emit the pending run, if it holds any text.
    fn flush_run(&mut self) {
        let Some(mut run) = self.pending.take() else {
            return;
        };
        self.decoder.settle(&mut run.buffer, &mut self.sink, run.offset);
        if !run.buffer.text.is_empty() {
            self.events.push(SemanticEvent::TextRun {
                text: run.buffer.text,
                frame: run.frame,
            });
        }
    }

    fn text(&mut self, bytes: &[u8], offset: usize) {
        self.ignorable = false;
        let skipped = self.fallback_skip.min(bytes.len());
        self.fallback_skip -= skipped;
        if skipped < bytes.len() {
            self.push_bytes(&bytes[skipped..], offset + skipped);
        }
    }

    fn push_bytes(&mut self, bytes: &[u8], offset: usize) {
        self.settle_surrogate();
        match self.dest() {
            Dest::Body => {
                let source = self.current_source();
                self.begin_visible(offset);
                if let Some(run) = &mut self.pending {
                    self.decoder
                        .push_bytes(&mut run.buffer, source, bytes, &mut self.sink, offset);
                }
            },
            Dest::InfoText(_) | Dest::FieldInstruction => {
                let source = self.current_source();
                self.decoder
                    .push_bytes(&mut self.capture, source, bytes, &mut self.sink, offset);
            },
            Dest::FontTable => self.font_table_text(bytes, offset),
            Dest::ColorTable => {
                for _ in memchr::memchr_iter(b';', bytes) {
                    let color = self.color_entry.take();
                    self.colors.push(color);
                }
            },
            Dest::Picture => {
                if let Some(picture) = &mut self.picture {
                    picture.push_hex(bytes);
                }
            },
            Dest::Suppressed | Dest::Info | Dest::InfoDate(_) => {},
        }
    }

    fn push_str(&mut self, text: &str, offset: usize) {
        self.settle_surrogate();
        match self.dest() {
            Dest::Body => {
                self.begin_visible(offset);
                if let Some(run) = &mut self.pending {
                    self.decoder
                        .push_str(&mut run.buffer, text, &mut self.sink, offset);
                }
            },
            Dest::InfoText(_) | Dest::FieldInstruction => {
                self.decoder
                    .push_str(&mut self.capture, text, &mut self.sink, offset);
            },
            _ => {},
        }
    }

    fn push_char(&mut self, ch: char, offset: usize) {
        let mut buf = [0u8; 4];
        self.push_str(ch.encode_utf8(&mut buf), offset);
    }

    fn push_replacement(&mut self, offset: usize) {
        if let Some(replacement) = self.decoder.options.replacement {
            self.push_char(replacement, offset);
        }
    }

    /// Consume one unit of `\u` fallback text, if any is left.
    #[inline]
    fn consume_fallback(&mut self) -> bool {
        if self.fallback_skip > 0 {
            self.fallback_skip -= 1;
            true
        } else {
            false
        }
    }

    fn unicode(&mut self, value: i32, offset: usize) {
        let code = if value < 0 {
            (value + 0x10000) as u32
        } else {
            value as u32
        };

        if let Some((high, high_offset)) = self.high_surrogate
            && (0xDC00..=0xDFFF).contains(&code)
        {
            self.high_surrogate = None;
            let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
            match char::from_u32(combined) {
                Some(ch) => self.push_char(ch, high_offset),
                None => self.push_replacement(high_offset),
            }
            return;
        }
        self.settle_surrogate();

        match code {
            0xD800..=0xDBFF => self.high_surrogate = Some((code, offset)),
            0xDC00..=0xDFFF => {
                self.sink.report(
                    DiagnosticKind::EncodingError,
                    offset,
                    format!("unpaired low surrogate U+{:04X}", code),
                );
                self.push_replacement(offset);
            },
            0xF020..=0xF0FF if self.current_source() == Source::Symbol => {
                let mut text = String::new();
                let byte = (code - 0xF000) as u8;
                if self.decoder.options.charmap.map_into(byte, &mut text) {
                    self.push_str(&text, offset);
                } else {
                    self.sink.report(
                        DiagnosticKind::EncodingError,
                        offset,
                        format!("symbol font code 0x{:02X} has no mapping", byte),
                    );
                    self.push_replacement(offset);
                }
            },
            _ => match char::from_u32(code) {
                Some(ch) => self.push_char(ch, offset),
                None => self.push_replacement(offset),
            },
        }
    }

    /// Replace a high surrogate that was not followed by a low one.
    fn settle_surrogate(&mut self) {
        if let Some((high, offset)) = self.high_surrogate.take() {
            self.sink.report(
                DiagnosticKind::EncodingError,
                offset,
                format!("unpaired high surrogate U+{:04X}", high),
            );
            self.push_replacement(offset);
        }
    }

    fn binary(&mut self, payload: &[u8]) {
        self.ignorable = false;
        if self.consume_fallback() {
            return;
        }
        self.settle_surrogate();
        let dest = self.dest();
        match &mut self.picture {
            Some(picture) if dest == Dest::Picture => picture.push_binary(payload),
            _ => log::trace!("discarding {} bytes of binary data", payload.len()),
        }
    }

    fn emit_special(&mut self, element: SpecialElement, visible: bool) {
        if self.dest() != Dest::Body {
            return;
        }
        self.flush_run();
        if visible {
            self.sync_table();
        }
        self.events.push(SemanticEvent::Special(element));
    }

    // ---- Control words ----

    fn control_symbol(&mut self, symbol: u8, offset: usize) {
        if symbol == b'*' {
            self.ignorable = true;
            return;
        }
        self.ignorable = false;
        if self.consume_fallback() {
            return;
        }
        match symbol {
            b'\\' | b'{' | b'}' => self.push_bytes(&[symbol], offset),
            b'~' => self.push_char('\u{A0}', offset),
            b'-' => self.push_char('\u{AD}', offset),
            b'_' => self.push_char('\u{2011}', offset),
            b'\n' | b'\r' => self.emit_special(SpecialElement::ParagraphBreak, true),
            _ => {},
        }
    }

    fn control_word(&mut self, name: &str, param: Option<i32>, offset: usize) {
        let ignorable = std::mem::take(&mut self.ignorable);
        if self.consume_fallback() {
            return;
        }
        if !matches!(name, "u" | "uc") {
            self.settle_surrogate();
        }

        let Some(entry) = keyword::lookup(name) else {
            if ignorable {
                log::trace!("skipping unknown destination \\{}", name);
                self.skip_group();
            }
            return;
        };

        let value = match entry.param {
            ParamKind::None => param.unwrap_or(0),
            ParamKind::Required => match param {
                Some(value) => value,
                None => {
                    self.sink.report(
                        DiagnosticKind::MalformedInput,
                        offset,
                        format!("\\{} requires a numeric parameter", name),
                    );
                    return;
                },
            },
            ParamKind::Optional(default) => param.unwrap_or(default),
            ParamKind::Flag => i32::from(param != Some(0)),
        };

        self.dispatch(entry.action, value, offset);
    }

    fn dispatch(&mut self, action: Action, value: i32, offset: usize) {
        match action {
            Action::Rtf | Action::Ignore | Action::RowDefaults => {},
            Action::Charset(charset) => self.set_document_charset(charset, offset),
            Action::AnsiCodePage => match u32::try_from(value).ok().and_then(codepage_to_encoding) {
                Some(encoding) => self.encoding = encoding,
                None => self.sink.report(
                    DiagnosticKind::UnsupportedConstruct,
                    offset,
                    format!("codepage {} is not supported", value),
                ),
            },
            Action::DefaultFont => {
                if let Ok(font) = FontRef::try_from(value) {
                    self.default_font = font;
                    self.frame_mut().font = font;
                }
            },
            Action::UnicodeSkip => self.top_mut().unicode_skip = value.max(0) as usize,
            Action::Unicode => {
                self.unicode(value, offset);
                self.fallback_skip = self.top().unicode_skip;
            },

            Action::Destination(destination) => self.enter_destination(destination, offset),

            Action::FontCharset => {
                if let Some(entry) = self.font_entry_mut() {
                    entry.font.charset = Some(value);
                }
            },
            Action::FontCodePage => {
                if let Some(entry) = self.font_entry_mut() {
                    entry.font.codepage = u32::try_from(value).ok().filter(|&cp| cp > 0);
                }
            },
            Action::FontFamily(family) => {
                if let Some(entry) = self.font_entry_mut() {
                    entry.font.family = family;
                }
            },

            Action::Red | Action::Green | Action::Blue => {
                if self.dest() == Dest::ColorTable {
                    let level = value.clamp(0, 255) as u8;
                    let color = self.color_entry.get_or_insert_with(Color::default);
                    match action {
                        Action::Red => color.red = level,
                        Action::Green => color.green = level,
                        _ => color.blue = level,
                    }
                }
            },

            Action::Plain => {
                let default_font = self.default_font;
                self.frame_mut().reset_character(default_font);
            },
            Action::Flag(flag) => self.frame_mut().set_flag(flag, value != 0),
            Action::Underline(style) => {
                self.frame_mut().underline = if value == 0 {
                    UnderlineStyle::None
                } else {
                    style
                };
            },
            Action::NoSuperSub => self
                .frame_mut()
                .flags
                .remove(CharFlags::SUPERSCRIPT | CharFlags::SUBSCRIPT),
            Action::Font => {
                let Ok(font) = FontRef::try_from(value) else {
                    return;
                };
                if self.dest() == Dest::FontTable {
                    self.commit_font(offset);
                    self.font_entry = Some(FontEntry {
                        index: font,
                        font: Font::default(),
                        name: SmallVec::new(),
                    });
                } else {
                    self.frame_mut().font = font;
                }
            },
            Action::FontSize => {
                self.frame_mut().font_size = value.clamp(1, i32::from(u16::MAX)) as u16;
            },
            Action::Foreground => {
                if let Ok(color) = u16::try_from(value) {
                    self.frame_mut().foreground = color;
                }
            },
            Action::Background => {
                if let Ok(color) = u16::try_from(value) {
                    self.frame_mut().background = color;
                }
            },
            Action::Expand => self.frame_mut().expand = value,
            Action::ExpandTwips => self.frame_mut().expand = value / 5,
            Action::Language => self.frame_mut().language = u16::try_from(value).ok(),

            Action::Pard => self.frame_mut().reset_paragraph(),
            Action::Align(alignment) => self.frame_mut().alignment = alignment,
            Action::InTable => self.frame_mut().in_table = true,

            Action::Par => self.emit_special(SpecialElement::ParagraphBreak, true),
            Action::Line => self.emit_special(SpecialElement::LineBreak, true),
            Action::Page => self.emit_special(SpecialElement::PageBreak, false),
            Action::Section => self.emit_special(SpecialElement::SectionBreak, false),
            Action::Tab => self.emit_special(SpecialElement::Tab, true),
            Action::Char(ch) => self.push_char(ch, offset),
            Action::FootnoteMark => {
                if self.dest() != Dest::Body {
                    return;
                }
                let number = if self.footnote_depth > 0 {
                    self.footnote_count.max(1)
                } else {
                    self.footnote_count += 1;
                    self.footnote_count
                };
                self.emit_special(SpecialElement::FootnoteMark(number), true);
            },

            Action::Cell => self.end_cell(),
            Action::Row => self.end_row(),

            Action::PictureType(image_type) => {
                if let Some(picture) = &mut self.picture {
                    picture.set_type(image_type);
                }
            },
            Action::PictureProp(prop) => {
                if let Some(picture) = &mut self.picture {
                    picture.set_prop(prop, value);
                }
            },

            Action::InfoNumber(field) => self.info.set_number(field, value),
            Action::DatePart(part) => self.date.set(part, value),
        }
    }

    fn set_document_charset(&mut self, charset: DocumentCharset, offset: usize) {
        let codepage = match charset {
            DocumentCharset::Ansi => 1252,
            DocumentCharset::Mac => 10000,
            DocumentCharset::Pc => 437,
            DocumentCharset::Pca => 850,
        };
        self.encoding = match codepage_to_encoding(codepage) {
            Some(encoding) => encoding,
            None => {
                self.sink.report(
                    DiagnosticKind::UnsupportedConstruct,
                    offset,
                    format!(
                        "codepage {} is not supported, decoding as {}",
                        codepage, DEFAULT_CODEPAGE
                    ),
                );
                encoding_rs::WINDOWS_1252
            },
        };
    }

    fn enter_destination(&mut self, destination: Destination, offset: usize) {
        match destination {
            Destination::FontTable => self.top_mut().dest = Dest::FontTable,
            Destination::ColorTable => {
                self.color_entry = None;
                self.top_mut().dest = Dest::ColorTable;
            },
            Destination::Info => self.top_mut().dest = Dest::Info,
            Destination::InfoText(field) => {
                self.capture = TextBuffer::new(self.encoding);
                let group = self.top_mut();
                group.dest = Dest::InfoText(field);
                group.closer = Closer::InfoText(field);
            },
            Destination::InfoDate(field) => {
                self.date = RtfDateTime::default();
                let group = self.top_mut();
                group.dest = Dest::InfoDate(field);
                group.closer = Closer::InfoDate(field);
            },
            Destination::Picture => {
                if self.decoder.options.suppress_pictures {
                    self.top_mut().dest = Dest::Suppressed;
                } else {
                    self.picture = Some(PictureBuilder::default());
                    let group = self.top_mut();
                    group.dest = Dest::Picture;
                    group.closer = Closer::Picture;
                }
            },
            Destination::ShapePicture => {},
            Destination::Object | Destination::UnicodeAlternate => {
                self.top_mut().dest = Dest::Suppressed;
            },
            Destination::ObjectResult | Destination::UnicodeText => {
                self.top_mut().dest = Dest::Body;
            },
            Destination::Field => {
                self.fields.push(FieldState::default());
                self.top_mut().closer = Closer::Field;
            },
            Destination::FieldInstruction => {
                self.capture = TextBuffer::new(self.encoding);
                let group = self.top_mut();
                group.dest = Dest::FieldInstruction;
                group.closer = Closer::FieldInstruction;
            },
            Destination::FieldResult => {
                let Some(state) = self.fields.last() else {
                    return;
                };
                if state.skip_result {
                    self.skip_group();
                } else if let Some(url) = state.hyperlink.clone()
                    && self.dest() == Dest::Body
                {
                    self.flush_run();
                    self.sync_table();
                    self.enter(GroupKind::Hyperlink(url));
                    self.top_mut().closer = Closer::Hyperlink;
                }
            },
            Destination::Footnote => {
                if self.dest() != Dest::Body {
                    self.skip_group();
                    return;
                }
                self.flush_run();
                self.sync_table();
                self.enter(GroupKind::Footnote);
                self.footnote_depth += 1;
                self.top_mut().closer = Closer::Footnote;
            },
            Destination::Skip => self.skip_group(),
        }
        log::trace!("destination {:?} at byte {}", destination, offset);
    }

    fn finish_field_instruction(&mut self, offset: usize) {
        self.decoder.settle(&mut self.capture, &mut self.sink, offset);
        let field = Field::parse_instruction(&self.capture.text);
        self.capture.text.clear();

        let hyperlink = field.extract_url();
        let symbol = field.extract_symbol();
        if let Some(state) = self.fields.last_mut() {
            state.hyperlink = hyperlink;
            state.skip_result = symbol.is_some();
        }

        self.emit_special(SpecialElement::Field(field), false);
        if let Some(symbol) = symbol {
            self.push_symbol_field(&symbol, offset);
        }
    }

    /// Write the character a `SYMBOL` field asks for.
    fn push_symbol_field(&mut self, symbol: &SymbolField, offset: usize) {
        let symbol_font = symbol
            .font
            .as_deref()
            .is_none_or(|name| name.eq_ignore_ascii_case("Symbol"));

        if !symbol.unicode && symbol_font {
            let code = match symbol.code {
                0xF000..=0xF0FF => symbol.code - 0xF000,
                code => code,
            };
            let mut text = String::new();
            if let Ok(byte) = u8::try_from(code)
                && self.decoder.options.charmap.map_into(byte, &mut text)
            {
                self.push_str(&text, offset);
                return;
            }
        } else if let Some(ch) = char::from_u32(symbol.code) {
            self.push_char(ch, offset);
            return;
        }

        self.sink.report(
            DiagnosticKind::EncodingError,
            offset,
            format!("SYMBOL field code {} cannot be represented", symbol.code),
        );
        self.push_replacement(offset);
    }

    // ---- Font table ----

    fn font_entry_mut(&mut self) -> Option<&mut FontEntry> {
        if self.dest() != Dest::FontTable {
            return None;
        }
        let index = self.fonts.len() as FontRef;
        Some(self.font_entry.get_or_insert_with(|| FontEntry {
            index,
            font: Font::default(),
            name: SmallVec::new(),
        }))
    }

    fn font_table_text(&mut self, bytes: &[u8], offset: usize) {
        for (i, part) in bytes.split(|&b| b == b';').enumerate() {
            if i > 0 {
                self.commit_font(offset);
            }
            if !part.is_empty()
                && let Some(entry) = self.font_entry_mut()
            {
                entry.name.extend_from_slice(part);
            }
        }
    }

    fn commit_font(&mut self, offset: usize) {
        let Some(FontEntry {
            index,
            mut font,
            name,
        }) = self.font_entry.take()
        else {
            return;
        };

        let codepage = font
            .codepage
            .or_else(|| font.charset.and_then(charset_to_codepage));
        let encoding = match codepage {
            Some(codepage) => codepage_to_encoding(codepage).unwrap_or_else(|| {
                self.sink.report(
                    DiagnosticKind::UnsupportedConstruct,
                    offset,
                    format!(
                        "font {} uses unsupported codepage {}, decoding with the document codepage",
                        index, codepage
                    ),
                );
                self.encoding
            }),
            None => self.encoding,
        };

        let (decoded, _) = decode_bytes(&name, encoding, Some(char::REPLACEMENT_CHARACTER))
            .unwrap_or_default();
        font.name = decoded.trim().to_string();
        log::trace!("font {}: {:?}", index, font);
        self.fonts.insert(index, font);
    }

    // ---- End of input ----

    fn finish(mut self) -> RtfDocument {
        let end = self.input_len;
        let unclosed = self.stack.len() + self.skip_depth.saturating_sub(1);
        if unclosed > 0 {
            self.sink.report(
                DiagnosticKind::MalformedInput,
                end,
                format!("truncated input: {} group(s) left open", unclosed),
            );
        }

        self.skip_depth = 0;
        while !self.stack.is_empty() {
            self.close_group(end);
        }
        self.settle_surrogate();
        self.flush_run();
        while !self.open.is_empty() {
            self.exit_top();
        }
        self.stats.final_depth = self.stack.len();

        let diagnostics = self.sink.into_vec();
        log::debug!(
            "parsed {} events, {} fonts, {} colors, {} diagnostics",
            self.events.len(),
            self.fonts.len(),
            self.colors.len(),
            diagnostics.len()
        );

        RtfDocument {
            events: self.events,
            fonts: self.fonts,
            colors: self.colors,
            info: self.info,
            default_font: self.default_font,
            diagnostics,
            stats: self.stats,
        }
    }
}
