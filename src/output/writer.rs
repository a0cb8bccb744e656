//! Output driver.
//!
//! Walks the event stream of a parsed document and writes it through a
//! [`FormatTemplate`]. Character attributes become nested spans: whenever
//! the formatting changes, spans that no longer apply are closed innermost
//! first and new ones are opened, so the output is always properly nested.
//! Spans never cross structural groups or paragraph breaks.

use super::template::{FormatTemplate, TemplateKey};
use crate::common::encoding::encode_str;
use crate::rtf::{
    Alignment, AttributeFrame, CharFlags, ColorRef, DEFAULT_FONT_SIZE, Diagnostic,
    DiagnosticKind, FontRef, GroupKind, RtfDocument, SemanticEvent, SpecialElement,
    UnderlineStyle,
};
use smallvec::SmallVec;

/// Rendered output of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Output in the template's encoding
    pub bytes: Vec<u8>,
    /// Problems found while writing
    pub diagnostics: Vec<Diagnostic>,
}

/// An open attribute span. Variants are listed in nesting order: a span
/// earlier in the list always encloses a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Align(Alignment),
    Font(FontRef),
    FontSize(u16),
    Foreground(ColorRef),
    Background(ColorRef),
    Bold,
    Italic,
    Underline,
    DoubleUnderline,
    Strike,
    DoubleStrike,
    Superscript,
    Subscript,
    SmallCaps,
    AllCaps,
    Outline,
    Shadow,
    Emboss,
    Engrave,
    Expand(i32),
}

impl Span {
    fn keys(self) -> (TemplateKey, TemplateKey) {
        use TemplateKey as K;
        match self {
            Span::Align(Alignment::Right) => (K::RightOn, K::RightOff),
            Span::Align(Alignment::Justify) => (K::JustifyOn, K::JustifyOff),
            Span::Align(_) => (K::CenterOn, K::CenterOff),
            Span::Font(_) => (K::FontOn, K::FontOff),
            Span::FontSize(_) => (K::FontSizeOn, K::FontSizeOff),
            Span::Foreground(_) => (K::ForegroundOn, K::ForegroundOff),
            Span::Background(_) => (K::BackgroundOn, K::BackgroundOff),
            Span::Bold => (K::BoldOn, K::BoldOff),
            Span::Italic => (K::ItalicOn, K::ItalicOff),
            Span::Underline => (K::UnderlineOn, K::UnderlineOff),
            Span::DoubleUnderline => (K::DoubleUnderlineOn, K::DoubleUnderlineOff),
            Span::Strike => (K::StrikeOn, K::StrikeOff),
            Span::DoubleStrike => (K::DoubleStrikeOn, K::DoubleStrikeOff),
            Span::Superscript => (K::SuperscriptOn, K::SuperscriptOff),
            Span::Subscript => (K::SubscriptOn, K::SubscriptOff),
            Span::SmallCaps => (K::SmallCapsOn, K::SmallCapsOff),
            Span::AllCaps => (K::AllCapsOn, K::AllCapsOff),
            Span::Outline => (K::OutlineOn, K::OutlineOff),
            Span::Shadow => (K::ShadowOn, K::ShadowOff),
            Span::Emboss => (K::EmbossOn, K::EmbossOff),
            Span::Engrave => (K::EngraveOn, K::EngraveOff),
            Span::Expand(_) => (K::ExpandOn, K::ExpandOff),
        }
    }
}

const FLAG_SPANS: [(CharFlags, Span); 6] = [
    (CharFlags::BOLD, Span::Bold),
    (CharFlags::ITALIC, Span::Italic),
    (CharFlags::STRIKE, Span::Strike),
    (CharFlags::DOUBLE_STRIKE, Span::DoubleStrike),
    (CharFlags::SUPERSCRIPT, Span::Superscript),
    (CharFlags::SUBSCRIPT, Span::Subscript),
];

const EFFECT_SPANS: [(CharFlags, Span); 4] = [
    (CharFlags::OUTLINE, Span::Outline),
    (CharFlags::SHADOW, Span::Shadow),
    (CharFlags::EMBOSS, Span::Emboss),
    (CharFlags::ENGRAVE, Span::Engrave),
];

type Spans = SmallVec<[Span; 8]>;

/// Render `doc` through `template`.
///
/// Rendering itself cannot fail. Characters the output encoding lacks are
/// written as the template's `unicode-char` literal, else its replacement
/// text, else dropped; each case is reported.
pub fn render(doc: &RtfDocument, template: &FormatTemplate) -> Rendered {
    let mut writer = Writer::new(doc, template);
    writer.run();
    writer.finish()
}

struct Writer<'d, 't> {
    doc: &'d RtfDocument,
    template: &'t FormatTemplate,
    out: String,
    open: Spans,
    diagnostics: Vec<Diagnostic>,
}

impl<'d, 't> Writer<'d, 't> {
    fn new(doc: &'d RtfDocument, template: &'t FormatTemplate) -> Self {
        Self {
            doc,
            template,
            out: String::with_capacity(4096),
            open: SmallVec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        let title = self.doc.info().title.as_deref().unwrap_or("");
        let title = self.escaped(title);
        self.literal(TemplateKey::Prologue, &title);

        for event in self.doc.events() {
            match event {
                SemanticEvent::TextRun { text, frame } => self.text_run(text, frame),
                SemanticEvent::EnterGroup(kind) => self.enter_group(kind),
                SemanticEvent::ExitGroup(kind) => self.exit_group(kind),
                SemanticEvent::Special(element) => self.special(element),
            }
        }

        self.close_spans(0);
        self.literal(TemplateKey::Epilogue, "");
    }

    /// Write the literal for `key`. Returns `false` when the template does
    /// not define it.
    fn literal(&mut self, key: TemplateKey, arg: &str) -> bool {
        match self.template.get(key) {
            Some(literal) => {
                literal.write_to(&mut self.out, arg);
                true
            },
            None => false,
        }
    }

    /// Apply the template's character escapes to `text`.
    fn escaped(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        push_escaped(&mut out, self.template, text);
        out
    }

    // ---- Spans ----

    fn desired_spans(&self, frame: &AttributeFrame) -> Spans {
        let template = self.template;
        let mut spans = Spans::new();
        let mut want = |span: Span| {
            if template.supports(span.keys().0) {
                spans.push(span);
            }
        };

        if frame.alignment != Alignment::Left {
            want(Span::Align(frame.alignment));
        }
        if frame.font != self.doc.default_font()
            && self
                .doc
                .fonts()
                .get(frame.font)
                .is_some_and(|font| !font.name.is_empty())
        {
            want(Span::Font(frame.font));
        }
        if frame.font_size != DEFAULT_FONT_SIZE {
            want(Span::FontSize(frame.font_size));
        }
        if frame.foreground > 0 && self.doc.colors().get(frame.foreground).is_some() {
            want(Span::Foreground(frame.foreground));
        }
        if frame.background > 0 && self.doc.colors().get(frame.background).is_some() {
            want(Span::Background(frame.background));
        }

        for (flag, span) in FLAG_SPANS.iter().take(2) {
            if frame.flags.contains(*flag) {
                want(*span);
            }
        }
        match frame.underline {
            UnderlineStyle::None => {},
            UnderlineStyle::Double if template.supports(TemplateKey::DoubleUnderlineOn) => {
                want(Span::DoubleUnderline)
            },
            _ => want(Span::Underline),
        }
        for (flag, span) in FLAG_SPANS.iter().skip(2) {
            if frame.flags.contains(*flag) {
                want(*span);
            }
        }
        if frame.flags.contains(CharFlags::SMALL_CAPS) && !template.simulate_small_caps() {
            want(Span::SmallCaps);
        }
        if frame.flags.contains(CharFlags::ALL_CAPS) && !template.simulate_all_caps() {
            want(Span::AllCaps);
        }
        for (flag, span) in EFFECT_SPANS {
            if frame.flags.contains(flag) {
                want(span);
            }
        }
        if frame.expand != 0 {
            want(Span::Expand(frame.expand));
        }

        spans
    }

    fn span_argument(&self, span: Span) -> String {
        let mut number = itoa::Buffer::new();
        match span {
            Span::Font(font) => {
                let name = self.doc.fonts().get(font).map_or("", |f| f.name.as_str());
                self.escaped(name)
            },
            Span::FontSize(half_points) => {
                let mut points = number.format(half_points / 2).to_string();
                if half_points % 2 == 1 {
                    points.push_str(".5");
                }
                points
            },
            Span::Foreground(color) | Span::Background(color) => self
                .doc
                .colors()
                .get(color)
                .map(|c| c.to_hex())
                .unwrap_or_default(),
            Span::Expand(quarter_points) => number.format(quarter_points).to_string(),
            _ => String::new(),
        }
    }

    fn open_span(&mut self, span: Span) {
        let arg = self.span_argument(span);
        self.literal(span.keys().0, &arg);
        self.open.push(span);
    }

    /// Close open spans down to `keep` of them.
    fn close_spans(&mut self, keep: usize) {
        while self.open.len() > keep {
            if let Some(span) = self.open.pop() {
                self.literal(span.keys().1, "");
            }
        }
    }

    fn transition(&mut self, desired: &[Span]) {
        let common = self
            .open
            .iter()
            .zip(desired)
            .take_while(|(open, want)| open == want)
            .count();
        let closed: Spans = self.open[common..].iter().copied().collect();
        self.close_spans(common);
        if self.template.restore_spans() && !closed.is_empty() {
            self.restore_spans(&closed);
        }
        for &span in &desired[common..] {
            self.open_span(span);
        }
    }

    /// Open again the remaining spans whose off literal matches one of the
    /// `closed` spans.
    fn restore_spans(&mut self, closed: &[Span]) {
        let template = self.template;
        for index in 0..self.open.len() {
            let span = self.open[index];
            let off = template.get(span.keys().1);
            if closed.iter().any(|c| template.get(c.keys().1) == off) {
                let arg = self.span_argument(span);
                self.literal(span.keys().0, &arg);
            }
        }
    }

    // ---- Events ----

    fn text_run(&mut self, text: &str, frame: &AttributeFrame) {
        if frame.is_hidden() {
            return;
        }
        let desired = self.desired_spans(frame);
        self.transition(&desired);

        let upper = (frame.flags.contains(CharFlags::ALL_CAPS) && self.template.simulate_all_caps())
            || (frame.flags.contains(CharFlags::SMALL_CAPS) && self.template.simulate_small_caps());
        if upper {
            self.push_text(&text.to_uppercase());
        } else {
            self.push_text(text);
        }
    }

    /// Write escaped document text, guarding lines that would start with a
    /// control character.
    fn push_text(&mut self, text: &str) {
        let Some(guard) = self.template.line_start_escape() else {
            push_escaped(&mut self.out, self.template, text);
            return;
        };
        for line in text.split_inclusive('\n') {
            let at_line_start = self.out.is_empty() || self.out.ends_with('\n');
            if at_line_start && line.starts_with(['.', '\'']) {
                self.out.push_str(guard);
            }
            push_escaped(&mut self.out, self.template, line);
        }
    }

    fn enter_group(&mut self, kind: &GroupKind) {
        self.close_spans(0);
        match kind {
            GroupKind::Table => self.literal(TemplateKey::TableBegin, ""),
            GroupKind::Row => self.literal(TemplateKey::RowBegin, ""),
            GroupKind::Cell => self.literal(TemplateKey::CellBegin, ""),
            GroupKind::Footnote => self.literal(TemplateKey::FootnoteBegin, ""),
            GroupKind::Hyperlink(url) => {
                let url = self.escaped(url);
                self.literal(TemplateKey::HyperlinkBegin, &url)
            },
        };
    }

    fn exit_group(&mut self, kind: &GroupKind) {
        self.close_spans(0);
        let key = match kind {
            GroupKind::Table => TemplateKey::TableEnd,
            GroupKind::Row => TemplateKey::RowEnd,
            GroupKind::Cell => TemplateKey::CellEnd,
            GroupKind::Footnote => TemplateKey::FootnoteEnd,
            GroupKind::Hyperlink(_) => TemplateKey::HyperlinkEnd,
        };
        self.literal(key, "");
    }

    fn special(&mut self, element: &SpecialElement) {
        match element {
            SpecialElement::ParagraphBreak => {
                self.close_spans(0);
                self.literal(TemplateKey::ParagraphBreak, "");
            },
            SpecialElement::LineBreak => {
                if !self.literal(TemplateKey::LineBreak, "") {
                    self.out.push('\n');
                }
            },
            SpecialElement::PageBreak | SpecialElement::SectionBreak => {
                self.close_spans(0);
                let key = if matches!(element, SpecialElement::PageBreak) {
                    TemplateKey::PageBreak
                } else {
                    TemplateKey::SectionBreak
                };
                if !self.literal(key, "") {
                    self.literal(TemplateKey::ParagraphBreak, "");
                }
            },
            SpecialElement::Tab => {
                if !self.literal(TemplateKey::Tab, "") {
                    self.out.push('\t');
                }
            },
            SpecialElement::Field(_) => {},
            SpecialElement::Picture(picture) => {
                self.literal(TemplateKey::Picture, picture.image_type.name());
            },
            SpecialElement::FootnoteMark(number) => {
                let mut buf = itoa::Buffer::new();
                let number = buf.format(*number);
                if !self.literal(TemplateKey::FootnoteMark, number) {
                    self.out.push_str(number);
                }
            },
        }
    }

    // ---- Encoding ----

    fn finish(mut self) -> Rendered {
        let template = self.template;
        let mut unencodable: Vec<char> = Vec::new();

        let result = encode_str(&self.out, template.encoding(), |ch| {
            unencodable.push(ch);
            if let Some(literal) = template.get(TemplateKey::UnicodeChar) {
                let mut buf = itoa::Buffer::new();
                let mut text = String::new();
                literal.write_to(&mut text, buf.format(ch as u32));
                return Some(text);
            }
            Some(template.replacement().unwrap_or("").to_string())
        });

        let bytes = match result {
            Ok(bytes) => bytes.into_owned(),
            // The substitute never declines, so encoding cannot fail
            Err(err) => {
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::EncodingError,
                    err.to_string(),
                ));
                Vec::new()
            },
        };

        if !unencodable.is_empty() && !template.supports(TemplateKey::UnicodeChar) {
            let dropped = template.replacement().is_none();
            let message = format!(
                "{} character(s) not representable in {} were {}, first U+{:04X}",
                unencodable.len(),
                template.encoding().name(),
                if dropped { "dropped" } else { "replaced" },
                unencodable[0] as u32
            );
            log::warn!("{}: {}", template.name(), message);
            self.diagnostics
                .push(Diagnostic::new(DiagnosticKind::EncodingError, message));
        }

        log::debug!("rendered {} bytes as {}", bytes.len(), template.name());
        Rendered {
            bytes,
            diagnostics: self.diagnostics,
        }
    }
}

fn push_escaped(out: &mut String, template: &FormatTemplate, text: &str) {
    if !template.has_char_escapes() {
        out.push_str(text);
        return;
    }
    for ch in text.chars() {
        match template.escape_char(ch) {
            Some(escape) => out.push_str(escape),
            None => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = "\
prologue <html><title>%s</title><body>
epilogue </body></html>
bold-on <b>
bold-off </b>
italic-on <i>
italic-off </i>
underline-on <u>
underline-off </u>
fontsize-on <span size=\"%s\">
fontsize-off </span>
foreground-on <span color=\"%s\">
foreground-off </span>
center-on <center>
center-off </center>
paragraph-break <p>
line-break <br>
table-begin <table>
table-end </table>
row-begin <tr>
row-end </tr>
cell-begin <td>
cell-end </td>
hyperlink-begin <a href=\"%s\">
hyperlink-end </a>
footnote-mark <sup>%s</sup>
unicode-char &#%s;
char:< &lt;
char:> &gt;
char:& &amp;
encoding us-ascii
";

    const TEXT: &str = "\
prologue
epilogue
bold-on
bold-off
italic-on
italic-off
paragraph-break %n
simulate-allcaps yes
encoding windows-1252
";

    const TROFF: &str = r"prologue
epilogue
bold-on \fB
bold-off \fR
italic-on \fI
italic-off \fR
fontsize-on \s[%s]
fontsize-off \s0
paragraph-break %n.P%n
restore-spans yes
line-start-escape \&
";

    fn render_str(rtf: &str, template: &str) -> (String, Vec<Diagnostic>) {
        let doc = RtfDocument::parse(rtf.as_bytes()).unwrap();
        let template = FormatTemplate::parse("test", template).unwrap();
        let rendered = render(&doc, &template);
        (
            String::from_utf8_lossy(&rendered.bytes).into_owned(),
            rendered.diagnostics,
        )
    }

    fn html(rtf: &str) -> String {
        render_str(rtf, HTML).0
    }

    #[test]
    fn test_bold_span() {
        assert_eq!(
            html(r"{\rtf1 Hello \b World\b0 !}"),
            "<html><title></title><body>Hello <b>World</b>!</body></html>"
        );
        assert_eq!(
            html(r"{\rtf1 {\b bold text}}"),
            "<html><title></title><body><b>bold text</b></body></html>"
        );
    }

    #[test]
    fn test_spans_nest_in_fixed_order() {
        // Italic starts first in the source but bold is the outer span
        let out = html(r"{\rtf1 \i a\b b\i0 c}");
        assert!(out.contains("<i>a</i><b><i>b</i>c</b>"), "{}", out);
    }

    #[test]
    fn test_spans_close_at_paragraph_break() {
        let out = html(r"{\rtf1\b one\par two}");
        assert!(out.contains("<b>one</b><p><b>two</b>"), "{}", out);
    }

    #[test]
    fn test_font_size_and_color_arguments() {
        let out = html(r"{\rtf1{\colortbl;\red255\green0\blue0;}\fs25\cf1 x}");
        assert!(
            out.contains("<span size=\"12.5\"><span color=\"#ff0000\">x</span></span>"),
            "{}",
            out
        );
    }

    #[test]
    fn test_missing_color_entry_ignored() {
        let out = html(r"{\rtf1\cf5 x}");
        assert!(out.ends_with("<body>x</body></html>"), "{}", out);
    }

    #[test]
    fn test_character_escapes_and_title() {
        let out = html(r"{\rtf1{\info{\title A&B}}a<b}");
        assert_eq!(out, "<html><title>A&amp;B</title><body>a&lt;b</body></html>");
    }

    #[test]
    fn test_unicode_char_literal() {
        // Lambda has no windows-1252 code
        let out = html(r"{\rtf1 x\u955?}");
        assert!(out.contains("<body>x&#955;</body>"), "{}", out);
    }

    #[test]
    fn test_hidden_text_skipped() {
        let out = html(r"{\rtf1 a{\v\b hidden}b}");
        assert!(out.ends_with("<body>ab</body></html>"), "{}", out);
    }

    #[test]
    fn test_table_and_hyperlink() {
        let out = html(r"{\rtf1\intbl A\cell\row\pard x}");
        assert!(out.contains("<table><tr><td>A</td></tr></table>x"), "{}", out);

        let out = html(r#"{\rtf1 {\field{\*\fldinst HYPERLINK "http://a.b/?x&y"}{\fldrslt \b go}}}"#);
        assert!(out.contains("<a href=\"http://a.b/?x&amp;y\"><b>go</b></a>"), "{}", out);
    }

    #[test]
    fn test_alignment_span() {
        let out = html(r"{\rtf1\qc mid\par\pard left}");
        assert!(out.contains("<center>mid</center><p>left"), "{}", out);
    }

    #[test]
    fn test_footnote_mark() {
        let out = html(r"{\rtf1 x\chftn}");
        assert!(out.contains("x<sup>1</sup>"), "{}", out);
    }

    #[test]
    fn test_text_defaults_and_caps() {
        let (out, diagnostics) = render_str(r"{\rtf1 a\tab b\line c\par{\caps loud}}", TEXT);
        assert_eq!(out, "a\tb\nc\nLOUD");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unencodable_replaced() {
        let doc = RtfDocument::parse(br"{\rtf1 x\u8364?y}").unwrap();
        let rendered = render(&doc, &FormatTemplate::parse("text", TEXT).unwrap());
        assert_eq!(rendered.bytes, b"x\x80y");
        assert!(rendered.diagnostics.is_empty());

        let (out, diagnostics) = render_str(r"{\rtf1 x\u4166?y}", TEXT);
        assert_eq!(out, "x?y");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EncodingError);
    }

    #[test]
    fn test_unencodable_dropped_without_replacement() {
        let template = format!("{}replacement\n", TEXT);
        let (out, diagnostics) = render_str(r"{\rtf1 x\u4166?y}", &template);
        assert_eq!(out, "xy");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_shared_off_literal_restores_outer_span() {
        let (out, _) = render_str(r"{\rtf1 {\b a{\i b}c}}", TROFF);
        assert_eq!(out, r"\fBa\fIb\fR\fBc\fR");

        let (out, _) = render_str(r"{\rtf1 \fs30 {\b a}b}", TROFF);
        assert_eq!(out, r"\s[15]\fBa\fRb\s0");
    }

    #[test]
    fn test_line_start_control_characters_escaped() {
        let (out, _) = render_str(r"{\rtf1 .a\par 'b\par c.d}", TROFF);
        assert_eq!(out, "\\&.a\n.P\n\\&'b\n.P\nc.d");

        let (out, _) = render_str(r"{\rtf1 .a}", TEXT);
        assert_eq!(out, ".a");
    }
}
