//! RTF field support (hyperlinks, cross-references, symbols, etc.).
//!
//! RTF fields are structured as:
//! {\field{\*\fldinst FIELD_INSTRUCTION}{\fldrslt FIELD_RESULT}}
//!
//! The instruction is decoded to text by the parser and handed to
//! [`Field::parse_instruction`]. The result is ordinary document content and
//! is rendered like any other text.

/// Field type in RTF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Hyperlink field
    Hyperlink,
    /// Cross-reference
    Reference,
    /// Page reference
    PageReference,
    /// Page number
    Page,
    /// Total page count
    NumPages,
    /// Date/time
    Date,
    /// Table of contents
    Toc,
    /// Single character from a font (`SYMBOL`)
    Symbol,
    /// Included text or picture
    Include,
    /// Mail-merge field
    MergeField,
    /// Equation/formula
    Equation,
    /// Index entry
    Index,
    /// Unknown or custom field
    Unknown,
}

impl FieldType {
    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "HYPERLINK" => FieldType::Hyperlink,
            "REF" => FieldType::Reference,
            "PAGEREF" => FieldType::PageReference,
            "PAGE" => FieldType::Page,
            "NUMPAGES" => FieldType::NumPages,
            "DATE" | "TIME" | "CREATEDATE" | "SAVEDATE" | "PRINTDATE" => FieldType::Date,
            "TOC" => FieldType::Toc,
            "SYMBOL" => FieldType::Symbol,
            "INCLUDEPICTURE" | "INCLUDETEXT" => FieldType::Include,
            "MERGEFIELD" => FieldType::MergeField,
            "EQ" => FieldType::Equation,
            "INDEX" | "XE" => FieldType::Index,
            _ => FieldType::Unknown,
        }
    }
}

/// Character requested by a `SYMBOL` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolField {
    /// Character code, interpreted in `font`
    pub code: u32,
    /// Font named by the `\f` switch
    pub font: Option<String>,
    /// `\u`: the code is a Unicode scalar value
    pub unicode: bool,
}

/// Parsed RTF field instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field type
    pub field_type: FieldType,
    /// Field instruction (the command)
    pub instruction: String,
}

impl Field {
    /// Parse a field instruction to extract the type.
    ///
    /// The type is taken from the first word, compared without regard to
    /// case.
    pub fn parse_instruction(instruction: &str) -> Self {
        let instruction = instruction.trim();
        let field_type = instruction
            .split_whitespace()
            .next()
            .map_or(FieldType::Unknown, FieldType::from_keyword);

        Self {
            field_type,
            instruction: instruction.to_string(),
        }
    }

    /// Arguments after the field keyword, with quoted arguments unquoted.
    fn arguments(&self) -> Vec<&str> {
        let mut args = Vec::new();
        let inst = self.instruction.as_str();
        let rest = inst
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest);
        let mut rest = rest.trim_start();

        while !rest.is_empty() {
            if let Some(quoted) = rest.strip_prefix('"') {
                let end = quoted.find('"').unwrap_or(quoted.len());
                args.push(&quoted[..end]);
                rest = quoted.get(end + 1..).unwrap_or("").trim_start();
            } else {
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                args.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
        }
        args
    }

    /// Extract URL from HYPERLINK field instruction.
    ///
    /// HYPERLINK fields have format: HYPERLINK "url" \o "tooltip". A local
    /// target given with `\l "anchor"` becomes `#anchor`, appended to the URL
    /// when both are present.
    ///
    /// # Returns
    ///
    /// URL if this is a hyperlink field, None otherwise
    pub fn extract_url(&self) -> Option<String> {
        if self.field_type != FieldType::Hyperlink {
            return None;
        }

        let mut url: Option<String> = None;
        let mut anchor: Option<&str> = None;
        let mut args = self.arguments().into_iter();

        while let Some(arg) = args.next() {
            match arg {
                "\\l" => anchor = args.next(),
                // Switches with an argument we do not need
                "\\o" | "\\t" => {
                    args.next();
                },
                s if s.starts_with('\\') => {},
                s if url.is_none() => url = Some(s.to_string()),
                _ => {},
            }
        }

        match (url, anchor) {
            (Some(url), Some(anchor)) => Some(format!("{}#{}", url, anchor)),
            (Some(url), None) => Some(url),
            (None, Some(anchor)) => Some(format!("#{}", anchor)),
            (None, None) => None,
        }
    }

    /// Extract the character of a SYMBOL field.
    ///
    /// SYMBOL fields have format: SYMBOL 183 \f "Symbol" \s 10. The code may
    /// be decimal or `0x` hexadecimal.
    pub fn extract_symbol(&self) -> Option<SymbolField> {
        if self.field_type != FieldType::Symbol {
            return None;
        }

        let mut code = None;
        let mut font = None;
        let mut unicode = false;
        let mut args = self.arguments().into_iter();

        while let Some(arg) = args.next() {
            match arg {
                "\\f" => font = args.next().map(str::to_string),
                "\\s" => {
                    args.next();
                },
                "\\u" => unicode = true,
                s if s.starts_with('\\') => {},
                s if code.is_none() => code = parse_code(s),
                _ => {},
            }
        }

        code.map(|code| SymbolField {
            code,
            font,
            unicode,
        })
    }
}

fn parse_code(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => atoi_simd::parse::<u32, false, false>(s.as_bytes()).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hyperlink() {
        let field = Field::parse_instruction(r#"HYPERLINK "https://example.com""#);
        assert_eq!(field.field_type, FieldType::Hyperlink);
        assert_eq!(field.extract_url(), Some("https://example.com".to_string()));
    }

    #[test]
    fn test_parse_hyperlink_with_tooltip() {
        let field = Field::parse_instruction(r#" HYPERLINK "https://example.com" \o "Click here""#);
        assert_eq!(field.field_type, FieldType::Hyperlink);
        assert_eq!(field.extract_url(), Some("https://example.com".to_string()));
    }

    #[test]
    fn test_parse_local_hyperlink() {
        let field = Field::parse_instruction(r#"HYPERLINK \l "_Toc123""#);
        assert_eq!(field.extract_url(), Some("#_Toc123".to_string()));

        let field = Field::parse_instruction(r#"HYPERLINK "doc.rtf" \l "part2""#);
        assert_eq!(field.extract_url(), Some("doc.rtf#part2".to_string()));
    }

    #[test]
    fn test_unquoted_hyperlink() {
        let field = Field::parse_instruction("hyperlink http://a.example/x");
        assert_eq!(field.field_type, FieldType::Hyperlink);
        assert_eq!(field.extract_url(), Some("http://a.example/x".to_string()));
    }

    #[test]
    fn test_parse_ref() {
        let field = Field::parse_instruction("REF MyBookmark \\h");
        assert_eq!(field.field_type, FieldType::Reference);
    }

    #[test]
    fn test_page_is_not_pageref() {
        assert_eq!(Field::parse_instruction("PAGE").field_type, FieldType::Page);
        let field = Field::parse_instruction("PAGEREF _Ref1 \\h");
        assert_eq!(field.field_type, FieldType::PageReference);
    }

    #[test]
    fn test_parse_symbol() {
        let field = Field::parse_instruction(r#"SYMBOL 183 \f "Symbol" \s 10"#);
        assert_eq!(field.field_type, FieldType::Symbol);
        assert_eq!(
            field.extract_symbol(),
            Some(SymbolField {
                code: 183,
                font: Some("Symbol".to_string()),
                unicode: false,
            })
        );

        let field = Field::parse_instruction(r#"SYMBOL 0x2192 \u"#);
        let symbol = field.extract_symbol().unwrap();
        assert_eq!(symbol.code, 0x2192);
        assert!(symbol.unicode);
    }

    #[test]
    fn test_unknown_field() {
        let field = Field::parse_instruction("AUTHOR");
        assert_eq!(field.field_type, FieldType::Unknown);
        assert_eq!(field.extract_url(), None);
        assert_eq!(Field::parse_instruction("").field_type, FieldType::Unknown);
    }
}
