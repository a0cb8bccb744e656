//! Symbol font character mapping.
//!
//! Text set in the Symbol font uses the font's own character codes (0x61 is
//! alpha, not "a"). The mapping to Unicode comes from a charmap file; the
//! built-in one is compiled in, and a configuration directory may supply its
//! own `SYMBOL.charmap`.

use crate::output::config::{ConfigError, parse_entries};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Name of the charmap file inside a configuration directory.
pub const CHARMAP_FILE: &str = "SYMBOL.charmap";

static BUILTIN: Lazy<Arc<CharMap>> = Lazy::new(|| {
    match CharMap::parse(include_str!("../../config/SYMBOL.charmap")) {
        Ok(map) => Arc::new(map),
        Err(err) => {
            log::error!("built-in symbol charmap is unusable: {}", err);
            Arc::new(CharMap::default())
        },
    }
});

/// Code-to-text table for one symbol font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharMap {
    entries: Vec<Option<Box<str>>>,
}

impl Default for CharMap {
    fn default() -> Self {
        Self {
            entries: vec![None; 256],
        }
    }
}

impl CharMap {
    /// The compiled-in Symbol font map.
    pub fn builtin() -> Arc<CharMap> {
        Arc::clone(&BUILTIN)
    }

    /// Parse a charmap file.
    ///
    /// Each entry is a code (decimal or `0x` hex, at most 255) followed by
    /// its replacement, either `U+XXXX` or literal text. A `#` preceded by
    /// whitespace starts a trailing comment.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        let syntax = |line: usize, message: String| ConfigError::Syntax {
            format: CHARMAP_FILE.to_string(),
            line,
            message,
        };

        for entry in parse_entries(CHARMAP_FILE, text)? {
            let code = parse_code(&entry.key)
                .ok_or_else(|| syntax(entry.line, format!("bad character code '{}'", entry.key)))?;

            let value = entry.value(CHARMAP_FILE)?;
            let text = value.text.as_str();
            let replacement = match text.find(" #").or_else(|| text.find("\t#")) {
                Some(comment) => text[..comment].trim_end(),
                None => text,
            };
            if replacement.is_empty() {
                return Err(syntax(entry.line, "missing replacement".to_string()));
            }

            let replacement = match replacement.strip_prefix("U+") {
                Some(hex) => u32::from_str_radix(hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        syntax(entry.line, format!("bad code point '{}'", replacement))
                    })?
                    .to_string(),
                None => replacement.to_string(),
            };
            map.entries[code as usize] = Some(replacement.into_boxed_str());
        }

        Ok(map)
    }

    /// Append the text for `code` to `out`.
    ///
    /// Codes without an entry pass through when they are ASCII; otherwise
    /// nothing is appended and `false` is returned.
    pub fn map_into(&self, code: u8, out: &mut String) -> bool {
        match &self.entries[code as usize] {
            Some(text) => {
                out.push_str(text);
                true
            },
            None if code.is_ascii() => {
                out.push(code as char);
                true
            },
            None => false,
        }
    }

    /// Map a whole run, substituting `replacement` for unmapped codes.
    ///
    /// Returns the number of unmapped codes. Without a replacement they are
    /// dropped.
    pub fn decode(&self, bytes: &[u8], replacement: Option<char>, out: &mut String) -> usize {
        let mut unmapped = 0;
        for &code in bytes {
            if !self.map_into(code, out) {
                unmapped += 1;
                if let Some(ch) = replacement {
                    out.push(ch);
                }
            }
        }
        unmapped
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether the map has no explicit entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_code(key: &str) -> Option<u8> {
    match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => atoi_simd::parse::<u8, false, false>(key.as_bytes()).ok(),
    }
}
