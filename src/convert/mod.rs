//! RTF conversion entry points.
//!
//! A [`Converter`] pairs a template set with conversion options and turns
//! RTF bytes into output bytes in one of the [`TargetFormat`]s.
//!
//! # Examples
//!
//! ```rust
//! use unrtf::{TargetFormat, convert};
//!
//! let result = convert(br"{\rtf1\ansi Hello \b World\b0 !}", TargetFormat::Text, false)?;
//! assert_eq!(result.output, b"Hello World!");
//! # Ok::<(), unrtf::Error>(())
//! ```

mod options;

pub use options::{CONFIG_DIR_ENV, ConvertOptions};

use crate::common::error::Result;
use crate::output::{TargetFormat, TemplateSet, render};
use crate::rtf::{Diagnostic, ParseOptions, RtfDocument};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Output in the format's encoding
    pub output: Vec<u8>,
    /// Problems found while reading and writing, in document order
    pub diagnostics: Vec<Diagnostic>,
    /// Format the output was written in
    pub format: TargetFormat,
}

impl Conversion {
    /// Output as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }

    /// Whether reading or writing reported any problem.
    #[inline]
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Converts RTF documents with a fixed set of templates and options.
///
/// A converter is cheap to clone and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Converter {
    templates: Arc<TemplateSet>,
    options: ConvertOptions,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

impl Converter {
    /// Converter reading templates from `options.config_dir`, or the
    /// built-in templates when it is `None`.
    pub fn new(options: ConvertOptions) -> Self {
        let templates = match &options.config_dir {
            Some(dir) => Arc::new(TemplateSet::from_dir(dir.clone())),
            None => TemplateSet::shared(),
        };
        Self { templates, options }
    }

    /// Converter with default options and templates read from `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(ConvertOptions::default().with_config_dir(dir))
    }

    #[inline]
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    #[inline]
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Convert one document.
    ///
    /// The template is loaded before the input is looked at, so a broken
    /// configuration fails every conversion. Input that is empty or only
    /// whitespace yields empty output.
    pub fn convert(&self, rtf: &[u8], format: TargetFormat) -> Result<Conversion> {
        let template = self.templates.get(format)?;

        if rtf.iter().all(u8::is_ascii_whitespace) {
            return Ok(Conversion {
                output: Vec::new(),
                diagnostics: Vec::new(),
                format,
            });
        }

        let parse_options = ParseOptions {
            suppress_pictures: self.options.suppress_pictures,
            max_depth: self.options.max_depth,
            replacement: self.options.replacement,
            charmap: self.templates.charmap()?,
        };
        let doc = RtfDocument::parse_with(rtf, &parse_options)?;
        let rendered = render(&doc, &template);

        let mut diagnostics = doc.diagnostics;
        diagnostics.extend(rendered.diagnostics);
        log::debug!(
            "converted {} input bytes to {} {} bytes, {} diagnostics",
            rtf.len(),
            rendered.bytes.len(),
            format,
            diagnostics.len()
        );

        Ok(Conversion {
            output: rendered.bytes,
            diagnostics,
            format,
        })
    }

    /// Convert independent documents, in parallel when the `parallel`
    /// feature is enabled. Results are in input order.
    #[cfg(feature = "parallel")]
    pub fn convert_many<I>(&self, inputs: &[I], format: TargetFormat) -> Vec<Result<Conversion>>
    where
        I: AsRef<[u8]> + Sync,
    {
        inputs
            .par_iter()
            .map(|input| self.convert(input.as_ref(), format))
            .collect()
    }

    /// Convert independent documents. Results are in input order.
    #[cfg(not(feature = "parallel"))]
    pub fn convert_many<I>(&self, inputs: &[I], format: TargetFormat) -> Vec<Result<Conversion>>
    where
        I: AsRef<[u8]>,
    {
        inputs
            .iter()
            .map(|input| self.convert(input.as_ref(), format))
            .collect()
    }
}

/// Convert `rtf` with the built-in templates.
pub fn convert(rtf: &[u8], format: TargetFormat, suppress_pictures: bool) -> Result<Conversion> {
    Converter::new(ConvertOptions::default().with_suppress_pictures(suppress_pictures))
        .convert(rtf, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::Error;
    use crate::rtf::DiagnosticKind;
    use proptest::prelude::*;
    use std::fs;
    use std::time::{Duration, Instant};

    const HELLO: &[u8] = br"{\rtf1\ansi Hello \b World\b0 !}";

    fn html_body(conversion: &Conversion) -> String {
        let text = conversion.text();
        let start = text.find("<body>").map_or(0, |i| i + "<body>".len());
        let end = text.rfind("</body>").unwrap_or(text.len());
        text[start..end].trim().to_string()
    }

    #[test]
    fn test_hello_world_text() {
        let result = convert(HELLO, TargetFormat::Text, false).unwrap();
        assert_eq!(result.text(), "Hello World!");
        assert!(!result.has_diagnostics());
    }

    #[test]
    fn test_hello_world_html() {
        let result = convert(HELLO, TargetFormat::Html, false).unwrap();
        assert_eq!(html_body(&result), "Hello <b>World</b>!");
    }

    #[test]
    fn test_bold_group_does_not_leak() {
        let result = convert(br"{\rtf1 {\b bold text} plain}", TargetFormat::Html, false).unwrap();
        assert_eq!(html_body(&result), "<b>bold text</b> plain");
    }

    #[test]
    fn test_every_builtin_format_converts() {
        let input = br"{\rtf1{\fonttbl{\f0 Times;}{\f1 Courier;}}{\colortbl;\red0\green128\blue0;}
\pard\qc{\b\i Title}\par
\pard\f1\cf1\fs28 body \ul text\ulnone\tab more\line end\par
\trowd\cellx1000\pard\intbl cell\cell\row
\pard after{\footnote\chftn note}\par}";
        for format in TargetFormat::ALL {
            let result = convert(input, format, false).unwrap();
            assert!(!result.output.is_empty(), "{}", format);
            assert!(
                result.diagnostics.is_empty(),
                "{}: {:?}",
                format,
                result.diagnostics
            );
        }
    }

    #[test]
    fn test_latex_and_vt_markup() {
        let latex = convert(HELLO, TargetFormat::Latex, false).unwrap();
        assert!(latex.text().contains(r"Hello \textbf{World}!"), "{}", latex.text());

        let vt = convert(HELLO, TargetFormat::Vt, false).unwrap();
        assert!(vt.text().contains("Hello \u{1b}[1mWorld\u{1b}[22m!"), "{:?}", vt.text());
    }

    #[test]
    fn test_troff_nested_fonts_and_cp1252() {
        let input = br"{\rtf1 {\b a{\i b}c} .d\u8364?}";
        let result = convert(input, TargetFormat::TroffMm, false).unwrap();
        let text = result.text();
        assert!(text.contains(r"\fBa\fIb\fR\fBc\fR"), "{}", text);
        assert!(text.contains(r" .d\[Eu]"), "{}", text);
        assert!(result.output.iter().all(|b| !(0x80..0xA0).contains(b)));
    }

    #[test]
    fn test_many_stray_braces_stay_linear() {
        let mut input = br"{\rtf1 x}".to_vec();
        input.extend_from_slice("\n}".repeat(200_000).as_bytes());
        let started = Instant::now();
        let result = convert(&input, TargetFormat::Text, false).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
        assert_eq!(result.text(), "x");
        assert_eq!(result.diagnostics.len(), 200_000);
        let last = result.diagnostics.last().and_then(|d| d.position);
        assert_eq!(last.map(|p| p.line), Some(200_001));
    }

    #[test]
    fn test_whitespace_only_input() {
        let result = convert(b" \r\n\t ", TargetFormat::Html, false).unwrap();
        assert!(result.output.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_truncated_input_keeps_text() {
        let result = convert(br"{\rtf1 Hello {\b Wor", TargetFormat::Text, false).unwrap();
        assert_eq!(result.text(), "Hello Wor");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::MalformedInput)
        );
    }

    #[test]
    fn test_bin_consumes_exact_byte_count() {
        let mut input = br"{\rtf1 a{\*\blob\bin4 ".to_vec();
        input.extend_from_slice(b"}}{{");
        input.extend_from_slice(b"}b}");
        let result = convert(&input, TargetFormat::Text, false).unwrap();
        assert_eq!(result.text(), "ab");
        assert!(!result.has_diagnostics());
    }

    #[test]
    fn test_nesting_limit_is_fatal() {
        let input = format!(r"{{\rtf1 {}x{}}}", "{".repeat(40), "}".repeat(40));
        let converter = Converter::new(ConvertOptions::new().with_max_depth(32));
        let err = converter.convert(input.as_bytes(), TargetFormat::Text).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted { limit: 32, .. }));
    }

    #[test]
    fn test_pictures_placeholder_and_suppression() {
        let input = br"{\rtf1 a{\pict\pngblip 89504e47}b}";
        let shown = convert(input, TargetFormat::Html, false).unwrap();
        assert!(html_body(&shown).contains("png"), "{}", shown.text());

        let hidden = convert(input, TargetFormat::Html, true).unwrap();
        assert_eq!(html_body(&hidden), "ab");
    }

    #[test]
    fn test_config_dir_missing_bold_on() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("html.conf"),
            "prologue <html>\nepilogue </html>\nbold-off </b>\nitalic-on <i>\nitalic-off </i>\nparagraph-break <p>\n",
        )
        .unwrap();

        let converter = Converter::from_dir(dir.path());
        let err = converter.convert(HELLO, TargetFormat::Html).unwrap_err();
        assert!(err.is_config());
        // Whitespace input fails too: the template is loaded first
        assert!(converter.convert(b"  ", TargetFormat::Html).is_err());
    }

    #[test]
    fn test_config_dir_templates_used() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("text.conf"),
            "prologue >>\nepilogue <<\nbold-on *\nbold-off *\nitalic-on /\nitalic-off /\nparagraph-break %n\n",
        )
        .unwrap();

        let converter = Converter::from_dir(dir.path());
        let result = converter.convert(HELLO, TargetFormat::Text).unwrap();
        assert_eq!(result.text(), ">>Hello *World*!<<");
    }

    #[test]
    fn test_convert_many_keeps_order() {
        let inputs: Vec<&[u8]> = vec![br"{\rtf1 one}", br"{\rtf1 two}", br"{\rtf1 three}"];
        let results = Converter::default().convert_many(&inputs, TargetFormat::Text);
        let texts: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().text().into_owned())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    fn rtf_fragment() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("{"),
            Just("}"),
            Just(r"\b "),
            Just(r"\b0 "),
            Just(r"\i "),
            Just(r"\par "),
            Just(r"\intbl "),
            Just(r"\cell "),
            Just(r"\row "),
            Just(r"\pard "),
            Just(r"\'e9"),
            Just(r"\u8364?"),
            Just(r"{\*\x y}"),
            Just(r"{\field{\*\fldinst HYPERLINK a}{\fldrslt "),
            Just(r"{\footnote "),
            Just("text "),
            Just("<&>"),
        ]
    }

    proptest! {
        #[test]
        fn prop_conversion_is_deterministic(
            parts in proptest::collection::vec(rtf_fragment(), 0..48)
        ) {
            let input = format!(r"{{\rtf1 {}", parts.concat());
            for format in [TargetFormat::Text, TargetFormat::Html] {
                let first = convert(input.as_bytes(), format, false).unwrap();
                let second = convert(input.as_bytes(), format, false).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn prop_group_pushes_and_pops_balance(
            parts in proptest::collection::vec(rtf_fragment(), 0..48)
        ) {
            let input = format!(r"{{\rtf1 {}", parts.concat());
            let doc = RtfDocument::parse(input.as_bytes()).unwrap();
            let stats = doc.stats();
            prop_assert_eq!(stats.pushes, stats.pops);
            prop_assert_eq!(stats.final_depth, 0);
        }

        #[test]
        fn prop_structural_events_nest(
            parts in proptest::collection::vec(rtf_fragment(), 0..48)
        ) {
            use crate::rtf::SemanticEvent;

            let input = format!(r"{{\rtf1 {}", parts.concat());
            let doc = RtfDocument::parse(input.as_bytes()).unwrap();
            let mut open = Vec::new();
            for event in doc.events() {
                match event {
                    SemanticEvent::EnterGroup(kind) => open.push(kind.clone()),
                    SemanticEvent::ExitGroup(kind) => {
                        let top = open.pop();
                        prop_assert_eq!(top.as_ref(), Some(kind));
                    },
                    _ => {}
                }
            }
            prop_assert!(open.is_empty());
        }
    }
}
