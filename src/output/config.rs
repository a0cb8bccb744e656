//! Reader for format description and charmap files.
//!
//! Both file kinds share one line syntax:
//!
//! ```text
//! # comment (only at the start of a line)
//! key value with spaces
//! key-without-value
//! multi-line first line
//!     second line, appended after a newline
//! ```
//!
//! Values are taken verbatim except for `%` escapes: `%n` newline, `%t` tab,
//! `%_` space, `%e` escape (0x1B), `%%` percent, and `%s` (or `%d`) marking
//! where a template argument goes. Backslashes have no special meaning.

use thiserror::Error;

/// Problems with a format description or charmap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A key every format must define is absent
    #[error("{format}: missing required key '{key}'")]
    MissingKey {
        /// Format or file name
        format: String,
        /// The missing key
        key: &'static str,
    },

    /// A line cannot be read
    #[error("{format}:{line}: {message}")]
    Syntax {
        /// Format or file name
        format: String,
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        message: String,
    },

    /// The `encoding` setting names no known encoding
    #[error("{format}: unknown output encoding '{label}'")]
    UnknownEncoding {
        /// Format or file name
        format: String,
        /// The label as written
        label: String,
    },

    /// A literal has more `%s` placeholders than its key accepts
    #[error("{format}: key '{key}' accepts {allowed} argument(s), found {found}")]
    TooManyArguments {
        /// Format or file name
        format: String,
        /// The offending key
        key: String,
        /// Placeholders the key accepts
        allowed: usize,
        /// Placeholders found
        found: usize,
    },
}

/// An unescaped value with the byte offsets of its placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub text: String,
    pub placeholders: Vec<usize>,
}

/// One `key value` entry.
///
/// The value is kept raw; escapes are resolved only for keys a reader
/// actually consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// Value text before `%` escapes are resolved, continuation lines joined
    /// by newlines
    pub raw: String,
    /// Line where the entry starts
    pub line: usize,
}

impl Entry {
    /// Resolve the escapes of the value, labelling errors with `name`.
    pub fn value(&self, name: &str) -> Result<Value, ConfigError> {
        unescape(&self.raw).map_err(|message| ConfigError::Syntax {
            format: name.to_string(),
            line: self.line,
            message,
        })
    }
}

/// Resolve the `%` escapes of a raw value.
pub fn unescape(raw: &str) -> Result<Value, String> {
    let mut value = Value {
        text: String::with_capacity(raw.len()),
        placeholders: Vec::new(),
    };
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            value.text.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.text.push('\n'),
            Some('t') => value.text.push('\t'),
            Some('_') => value.text.push(' '),
            Some('e') => value.text.push('\u{1b}'),
            Some('%') => value.text.push('%'),
            Some('s') | Some('d') => value.placeholders.push(value.text.len()),
            Some(other) => return Err(format!("unknown escape '%{}'", other)),
            None => return Err("dangling '%' at end of value".to_string()),
        }
    }
    Ok(value)
}

/// Split a description into entries.
///
/// `name` only labels errors. Later entries for the same key are kept;
/// callers resolve duplicates by letting the last one win.
pub fn parse_entries(name: &str, text: &str) -> Result<Vec<Entry>, ConfigError> {
    let syntax = |line: usize, message: String| ConfigError::Syntax {
        format: name.to_string(),
        line,
        message,
    };

    let mut entries: Vec<Entry> = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let Some(last) = entries.last_mut() else {
                return Err(syntax(line_no, "continuation line without a key".to_string()));
            };
            last.raw.push('\n');
            last.raw.push_str(line.trim_start());
            continue;
        }

        let (key, raw_value) = match line.split_once([' ', '\t']) {
            Some((key, rest)) => (key, rest.trim_start()),
            None => (line, ""),
        };
        entries.push(Entry {
            key: key.to_string(),
            raw: raw_value.to_string(),
            line: line_no,
        });
    }

    Ok(entries)
}

/// Interpret a yes/no setting.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        let value = unescape(r"\textbf{%s}%n").unwrap();
        assert_eq!(value.text, "\\textbf{}\n");
        assert_eq!(value.placeholders, vec![8]);

        assert_eq!(unescape("100%%").unwrap().text, "100%");
        assert_eq!(unescape("%e[1m").unwrap().text, "\u{1b}[1m");
        assert_eq!(unescape("a%_%tb").unwrap().text, "a \tb");
        assert!(unescape("%q").is_err());
        assert!(unescape("50%").is_err());
    }

    #[test]
    fn test_percent_escape_is_not_a_placeholder() {
        let value = unescape("%%s").unwrap();
        assert_eq!(value.text, "%s");
        assert!(value.placeholders.is_empty());
    }

    #[test]
    fn test_parse_entries() {
        let text = "# comment\n\nbold-on <b>\nbold-off </b>   \nempty\n\
                    prologue <html>\n  <body>\nitalic-on\t<i>\n";
        let entries = parse_entries("html", text).unwrap();
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.key.as_str(), e.raw.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bold-on", "<b>"),
                ("bold-off", "</b>"),
                ("empty", ""),
                ("prologue", "<html>\n<body>"),
                ("italic-on", "<i>"),
            ]
        );
        assert_eq!(entries[3].line, 6);
    }

    #[test]
    fn test_continuation_shifts_placeholders() {
        let entries = parse_entries("x", "prologue <p>\n  <t>%s</t>\n").unwrap();
        let value = entries[0].value("x").unwrap();
        assert_eq!(value.text, "<p>\n<t></t>");
        assert_eq!(value.placeholders, vec![7]);
    }

    #[test]
    fn test_syntax_errors_carry_line() {
        let entries = parse_entries("vt", "bold-on ok\nbold-off %z\n").unwrap();
        assert_eq!(entries[1].raw, "%z");
        let err = entries[1].value("vt").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Syntax {
                format: "vt".to_string(),
                line: 2,
                message: "unknown escape '%z'".to_string(),
            }
        );

        let err = parse_entries("vt", "  orphan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
