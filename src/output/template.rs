//! Output format templates.
//!
//! A [`FormatTemplate`] is the resolved form of one format description file:
//! the literal text written for every structural element and attribute
//! transition, the per-character escapes, and the output encoding. Templates
//! are immutable once parsed and are shared between conversions.

use super::config::{ConfigError, Entry, Value, parse_bool, parse_entries};
use encoding_rs::Encoding;
use std::collections::HashMap;

macro_rules! template_keys {
    ($( $variant:ident => $name:literal, $args:literal; )*) => {
        /// Literal slots a format description can fill.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TemplateKey {
            $( $variant, )*
        }

        impl TemplateKey {
            /// Every key, in declaration order.
            pub const ALL: &'static [TemplateKey] = &[$( TemplateKey::$variant, )*];

            /// Name used in format description files.
            pub fn name(self) -> &'static str {
                match self {
                    $( TemplateKey::$variant => $name, )*
                }
            }

            /// Number of `%s` placeholders the literal may contain.
            pub fn max_args(self) -> usize {
                match self {
                    $( TemplateKey::$variant => $args, )*
                }
            }

            /// Look a key up by its file name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(TemplateKey::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

template_keys! {
    Prologue => "prologue", 1;
    Epilogue => "epilogue", 0;
    BoldOn => "bold-on", 0;
    BoldOff => "bold-off", 0;
    ItalicOn => "italic-on", 0;
    ItalicOff => "italic-off", 0;
    UnderlineOn => "underline-on", 0;
    UnderlineOff => "underline-off", 0;
    DoubleUnderlineOn => "double-underline-on", 0;
    DoubleUnderlineOff => "double-underline-off", 0;
    StrikeOn => "strike-on", 0;
    StrikeOff => "strike-off", 0;
    DoubleStrikeOn => "double-strike-on", 0;
    DoubleStrikeOff => "double-strike-off", 0;
    SuperscriptOn => "superscript-on", 0;
    SuperscriptOff => "superscript-off", 0;
    SubscriptOn => "subscript-on", 0;
    SubscriptOff => "subscript-off", 0;
    SmallCapsOn => "smallcaps-on", 0;
    SmallCapsOff => "smallcaps-off", 0;
    AllCapsOn => "allcaps-on", 0;
    AllCapsOff => "allcaps-off", 0;
    OutlineOn => "outline-on", 0;
    OutlineOff => "outline-off", 0;
    ShadowOn => "shadow-on", 0;
    ShadowOff => "shadow-off", 0;
    EmbossOn => "emboss-on", 0;
    EmbossOff => "emboss-off", 0;
    EngraveOn => "engrave-on", 0;
    EngraveOff => "engrave-off", 0;
    ExpandOn => "expand-on", 1;
    ExpandOff => "expand-off", 0;
    FontOn => "font-on", 1;
    FontOff => "font-off", 0;
    FontSizeOn => "fontsize-on", 1;
    FontSizeOff => "fontsize-off", 0;
    ForegroundOn => "foreground-on", 1;
    ForegroundOff => "foreground-off", 0;
    BackgroundOn => "background-on", 1;
    BackgroundOff => "background-off", 0;
    CenterOn => "center-on", 0;
    CenterOff => "center-off", 0;
    RightOn => "right-on", 0;
    RightOff => "right-off", 0;
    JustifyOn => "justify-on", 0;
    JustifyOff => "justify-off", 0;
    ParagraphBreak => "paragraph-break", 0;
    LineBreak => "line-break", 0;
    PageBreak => "page-break", 0;
    SectionBreak => "section-break", 0;
    Tab => "tab", 0;
    TableBegin => "table-begin", 0;
    TableEnd => "table-end", 0;
    RowBegin => "row-begin", 0;
    RowEnd => "row-end", 0;
    CellBegin => "cell-begin", 0;
    CellEnd => "cell-end", 0;
    FootnoteBegin => "footnote-begin", 0;
    FootnoteEnd => "footnote-end", 0;
    FootnoteMark => "footnote-mark", 1;
    HyperlinkBegin => "hyperlink-begin", 1;
    HyperlinkEnd => "hyperlink-end", 0;
    Picture => "picture", 1;
    UnicodeChar => "unicode-char", 1;
}

/// Keys every format description must define.
pub const REQUIRED_KEYS: [TemplateKey; 7] = [
    TemplateKey::Prologue,
    TemplateKey::Epilogue,
    TemplateKey::BoldOn,
    TemplateKey::BoldOff,
    TemplateKey::ItalicOn,
    TemplateKey::ItalicOff,
    TemplateKey::ParagraphBreak,
];

/// Replacement written for unencodable characters when a description sets
/// none.
pub const DEFAULT_REPLACEMENT: &str = "?";

/// Literal text with at most one argument slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    before: String,
    after: Option<String>,
}

impl Literal {
    /// Literal without an argument slot.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            before: text.into(),
            after: None,
        }
    }

    fn from_value(value: Value) -> Self {
        match value.placeholders.first() {
            Some(&at) => {
                let mut before = value.text;
                let after = before.split_off(at);
                Self {
                    before,
                    after: Some(after),
                }
            },
            None => Self::plain(value.text),
        }
    }

    /// Whether writing the literal produces no text.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.as_deref().is_none_or(str::is_empty)
    }

    /// Append the literal to `out`, putting `arg` into its slot. The argument
    /// is dropped when there is no slot.
    pub fn write_to(&self, out: &mut String, arg: &str) {
        out.push_str(&self.before);
        if let Some(after) = &self.after {
            out.push_str(arg);
            out.push_str(after);
        }
    }
}

/// Resolved format description.
#[derive(Debug, Clone)]
pub struct FormatTemplate {
    name: String,
    literals: HashMap<TemplateKey, Literal>,
    char_escapes: HashMap<char, String>,
    encoding: &'static Encoding,
    replacement: Option<String>,
    simulate_all_caps: bool,
    simulate_small_caps: bool,
    restore_spans: bool,
    line_start_escape: Option<String>,
}

impl FormatTemplate {
    /// Parse a format description.
    ///
    /// `name` identifies the format in errors. Unknown keys are ignored and
    /// a later definition of a key replaces an earlier one.
    pub fn parse(name: &str, text: &str) -> Result<Self, ConfigError> {
        let entries = parse_entries(name, text)?;
        let mut template = Self {
            name: name.to_string(),
            literals: HashMap::new(),
            char_escapes: HashMap::new(),
            encoding: encoding_rs::UTF_8,
            replacement: Some(DEFAULT_REPLACEMENT.to_string()),
            simulate_all_caps: false,
            simulate_small_caps: false,
            restore_spans: false,
            line_start_escape: None,
        };

        for entry in entries {
            template.apply(entry)?;
        }

        if let Some(key) = REQUIRED_KEYS
            .iter()
            .find(|key| !template.literals.contains_key(key))
        {
            return Err(ConfigError::MissingKey {
                format: template.name,
                key: key.name(),
            });
        }

        log::debug!(
            "loaded format '{}': {} literals, {} character escapes, encoding {}",
            template.name,
            template.literals.len(),
            template.char_escapes.len(),
            template.encoding.name()
        );
        Ok(template)
    }

    fn apply(&mut self, entry: Entry) -> Result<(), ConfigError> {
        let syntax = |message: String| ConfigError::Syntax {
            format: self.name.clone(),
            line: entry.line,
            message,
        };

        if let Some(key) = TemplateKey::from_name(&entry.key) {
            let value = entry.value(&self.name)?;
            let found = value.placeholders.len();
            if found > key.max_args() {
                return Err(ConfigError::TooManyArguments {
                    format: self.name.clone(),
                    key: entry.key,
                    allowed: key.max_args(),
                    found,
                });
            }
            self.literals.insert(key, Literal::from_value(value));
            return Ok(());
        }

        if let Some(code) = entry.key.strip_prefix("char:") {
            let ch = parse_char(code)
                .ok_or_else(|| syntax(format!("bad character in key '{}'", entry.key)))?;
            self.char_escapes.insert(ch, entry.value(&self.name)?.text);
            return Ok(());
        }

        match entry.key.as_str() {
            "encoding" => {
                let value = entry.value(&self.name)?;
                let label = value.text.trim();
                self.encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                    ConfigError::UnknownEncoding {
                        format: self.name.clone(),
                        label: label.to_string(),
                    }
                })?;
            },
            "replacement" => {
                let text = entry.value(&self.name)?.text;
                self.replacement = (!text.is_empty()).then_some(text);
            },
            "simulate-allcaps" | "simulate-smallcaps" | "restore-spans" => {
                let on = parse_bool(&entry.value(&self.name)?.text)
                    .ok_or_else(|| syntax(format!("'{}' expects yes or no", entry.key)))?;
                match entry.key.as_str() {
                    "simulate-allcaps" => self.simulate_all_caps = on,
                    "simulate-smallcaps" => self.simulate_small_caps = on,
                    _ => self.restore_spans = on,
                }
            },
            "line-start-escape" => {
                let text = entry.value(&self.name)?.text;
                self.line_start_escape = (!text.is_empty()).then_some(text);
            },
            other => log::debug!("{}:{}: ignoring unknown key '{}'", self.name, entry.line, other),
        }
        Ok(())
    }

    /// Format name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Literal for `key`, if the description defines it.
    #[inline]
    pub fn get(&self, key: TemplateKey) -> Option<&Literal> {
        self.literals.get(&key)
    }

    /// Whether the description defines `key`.
    #[inline]
    pub fn supports(&self, key: TemplateKey) -> bool {
        self.literals.contains_key(&key)
    }

    /// Output escape for `ch`.
    #[inline]
    pub fn escape_char(&self, ch: char) -> Option<&str> {
        self.char_escapes.get(&ch).map(String::as_str)
    }

    /// Whether any character escapes are defined.
    #[inline]
    pub fn has_char_escapes(&self) -> bool {
        !self.char_escapes.is_empty()
    }

    /// Output encoding.
    #[inline]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Text written for characters the output encoding lacks, `None` to drop
    /// them.
    #[inline]
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Upper-case all-caps text instead of wrapping it.
    #[inline]
    pub fn simulate_all_caps(&self) -> bool {
        self.simulate_all_caps
    }

    /// Upper-case small-caps text instead of wrapping it.
    #[inline]
    pub fn simulate_small_caps(&self) -> bool {
        self.simulate_small_caps
    }

    /// Whether an off literal also ends every enclosing span that shares it,
    /// so those spans must be opened again.
    #[inline]
    pub fn restore_spans(&self) -> bool {
        self.restore_spans
    }

    /// Text written before a `.` or `'` that would start an output line.
    #[inline]
    pub fn line_start_escape(&self) -> Option<&str> {
        self.line_start_escape.as_deref()
    }
}

fn parse_char(code: &str) -> Option<char> {
    if let Some(hex) = code.strip_prefix("U+") {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "prologue <doc title=\"%s\">\nepilogue </doc>\n\
                           bold-on <b>\nbold-off </b>\nitalic-on <i>\nitalic-off </i>\n\
                           paragraph-break <p>\n";

    #[test]
    fn test_key_names_round_trip() {
        for key in TemplateKey::ALL {
            assert_eq!(TemplateKey::from_name(key.name()), Some(*key));
        }
        assert_eq!(TemplateKey::from_name("blink-on"), None);
    }

    #[test]
    fn test_minimal_template() {
        let template = FormatTemplate::parse("mini", MINIMAL).unwrap();
        assert_eq!(template.name(), "mini");
        assert!(template.supports(TemplateKey::BoldOn));
        assert!(!template.supports(TemplateKey::UnderlineOn));
        assert_eq!(template.encoding(), encoding_rs::UTF_8);
        assert_eq!(template.replacement(), Some("?"));

        let mut out = String::new();
        template
            .get(TemplateKey::Prologue)
            .unwrap()
            .write_to(&mut out, "T");
        assert_eq!(out, "<doc title=\"T\">");
    }

    #[test]
    fn test_missing_required_key() {
        let text = MINIMAL.replace("bold-on <b>\n", "");
        let err = FormatTemplate::parse("broken", &text).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingKey {
                format: "broken".to_string(),
                key: "bold-on",
            }
        );
    }

    #[test]
    fn test_empty_value_counts_as_defined() {
        let text = "prologue\nepilogue\nbold-on\nbold-off\nitalic-on\nitalic-off\nparagraph-break %n\n";
        let template = FormatTemplate::parse("text", text).unwrap();
        assert!(template.get(TemplateKey::BoldOn).unwrap().is_empty());
    }

    #[test]
    fn test_last_definition_wins() {
        let text = format!("{}bold-on <strong>\n", MINIMAL);
        let template = FormatTemplate::parse("dup", &text).unwrap();
        let mut out = String::new();
        template.get(TemplateKey::BoldOn).unwrap().write_to(&mut out, "");
        assert_eq!(out, "<strong>");
    }

    #[test]
    fn test_too_many_arguments() {
        let text = format!("{}bold-on <b %s>\n", MINIMAL);
        let err = FormatTemplate::parse("args", &text).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooManyArguments {
                allowed: 0,
                found: 1,
                ..
            }
        ));

        let text = format!("{}font-on <f %s %s>\n", MINIMAL);
        assert!(FormatTemplate::parse("args", &text).is_err());
    }

    #[test]
    fn test_settings() {
        let text = format!(
            "{}encoding iso-8859-1\nreplacement\nsimulate-allcaps yes\n\
             char:< &lt;\nchar:U+00A0 &nbsp;\nunknown-key whatever\n\
             restore-spans yes\nline-start-escape \\&\n",
            MINIMAL
        );
        let template = FormatTemplate::parse("settings", &text).unwrap();
        assert_eq!(template.encoding(), encoding_rs::WINDOWS_1252);
        assert_eq!(template.replacement(), None);
        assert!(template.simulate_all_caps());
        assert!(!template.simulate_small_caps());
        assert!(template.restore_spans());
        assert_eq!(template.line_start_escape(), Some("\\&"));
        assert_eq!(template.escape_char('<'), Some("&lt;"));
        assert_eq!(template.escape_char('\u{a0}'), Some("&nbsp;"));
        assert_eq!(template.escape_char('>'), None);
    }

    #[test]
    fn test_bad_settings() {
        let text = format!("{}encoding klingon\n", MINIMAL);
        assert!(matches!(
            FormatTemplate::parse("enc", &text),
            Err(ConfigError::UnknownEncoding { .. })
        ));

        let text = format!("{}char:ab x\n", MINIMAL);
        assert!(matches!(
            FormatTemplate::parse("chr", &text),
            Err(ConfigError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unknown_key_value_is_not_unescaped() {
        let text = format!("{}future-key 50%
other-key %z
", MINIMAL);
        assert!(FormatTemplate::parse("future", &text).is_ok());

        let text = format!("{}bold-on 50%
", MINIMAL);
        let err = FormatTemplate::parse("bad", &text).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 8, .. }));
    }
}
