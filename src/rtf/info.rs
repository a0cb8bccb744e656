//! RTF document information and properties.
//!
//! Collects the metadata of the `{\info ...}` group: text properties like
//! title and author, timestamps built from `\yr \mo \dy \hr \min \sec`, and
//! statistics such as page and word counts.

use std::fmt;

/// Text property of the info group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoField {
    Title,
    Subject,
    Author,
    Manager,
    Company,
    Operator,
    Category,
    Keywords,
    Comment,
    DocComment,
    HyperlinkBase,
}

/// Timestamp property of the info group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Creation,
    Revision,
    Print,
    Backup,
}

/// Numeric property of the info group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoNumber {
    Version,
    InternalVersion,
    EditingMinutes,
    Pages,
    Words,
    Characters,
    CharactersWithSpaces,
    Id,
}

/// Component of an RTF timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// Timestamp assembled from the `\yr \mo \dy \hr \min \sec` words of a
/// `\creatim`, `\revtim`, `\printim` or `\buptim` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtfDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl RtfDateTime {
    /// Set one component. Out-of-range values are clamped into `u8`.
    pub fn set(&mut self, part: DatePart, value: i32) {
        let small = value.clamp(0, u8::MAX as i32) as u8;
        match part {
            DatePart::Year => self.year = value,
            DatePart::Month => self.month = small,
            DatePart::Day => self.day = small,
            DatePart::Hour => self.hour = small,
            DatePart::Minute => self.minute = small,
            DatePart::Second => self.second = small,
        }
    }
}

impl fmt::Display for RtfDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )?;
        if self.second != 0 {
            write!(f, ":{:02}", self.second)?;
        }
        Ok(())
    }
}

/// Document information/metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document title
    pub title: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document manager
    pub manager: Option<String>,
    /// Company name
    pub company: Option<String>,
    /// Operator (last person to modify)
    pub operator: Option<String>,
    /// Document category
    pub category: Option<String>,
    /// Keywords
    pub keywords: Option<String>,
    /// Comments
    pub comment: Option<String>,
    /// Long-form document comment (`\doccomm`)
    pub doc_comment: Option<String>,
    /// Base address for relative hyperlinks
    pub hyperlink_base: Option<String>,
    /// Document version
    pub version: Option<i32>,
    /// Internal version number
    pub internal_version: Option<i32>,
    /// Creation time
    pub creation_time: Option<RtfDateTime>,
    /// Revision time (last modified)
    pub revision_time: Option<RtfDateTime>,
    /// Print time (last printed)
    pub print_time: Option<RtfDateTime>,
    /// Backup time
    pub backup_time: Option<RtfDateTime>,
    /// Total editing time (in minutes)
    pub editing_time: Option<i32>,
    /// Number of pages
    pub pages: Option<i32>,
    /// Number of words
    pub words: Option<i32>,
    /// Number of characters
    pub characters: Option<i32>,
    /// Number of characters including spaces
    pub characters_with_spaces: Option<i32>,
    /// Document ID (internal identifier)
    pub id: Option<i32>,
}

impl DocumentInfo {
    /// Create an empty document info
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a text property. Surrounding whitespace is trimmed and empty
    /// values are ignored.
    pub fn set_text(&mut self, field: InfoField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            InfoField::Title => &mut self.title,
            InfoField::Subject => &mut self.subject,
            InfoField::Author => &mut self.author,
            InfoField::Manager => &mut self.manager,
            InfoField::Company => &mut self.company,
            InfoField::Operator => &mut self.operator,
            InfoField::Category => &mut self.category,
            InfoField::Keywords => &mut self.keywords,
            InfoField::Comment => &mut self.comment,
            InfoField::DocComment => &mut self.doc_comment,
            InfoField::HyperlinkBase => &mut self.hyperlink_base,
        };
        *slot = Some(value.to_string());
    }

    /// Store a timestamp property.
    pub fn set_date(&mut self, field: DateField, value: RtfDateTime) {
        let slot = match field {
            DateField::Creation => &mut self.creation_time,
            DateField::Revision => &mut self.revision_time,
            DateField::Print => &mut self.print_time,
            DateField::Backup => &mut self.backup_time,
        };
        *slot = Some(value);
    }

    /// Store a numeric property.
    pub fn set_number(&mut self, field: InfoNumber, value: i32) {
        let slot = match field {
            InfoNumber::Version => &mut self.version,
            InfoNumber::InternalVersion => &mut self.internal_version,
            InfoNumber::EditingMinutes => &mut self.editing_time,
            InfoNumber::Pages => &mut self.pages,
            InfoNumber::Words => &mut self.words,
            InfoNumber::Characters => &mut self.characters,
            InfoNumber::CharactersWithSpaces => &mut self.characters_with_spaces,
            InfoNumber::Id => &mut self.id,
        };
        *slot = Some(value);
    }

    /// Whether no property was recorded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_text_trims_and_skips_empty() {
        let mut info = DocumentInfo::new();
        info.set_text(InfoField::Title, "  Annual Report ");
        info.set_text(InfoField::Author, "   ");
        assert_eq!(info.title.as_deref(), Some("Annual Report"));
        assert_eq!(info.author, None);
        assert!(!info.is_empty());
    }

    #[test]
    fn test_datetime_assembly_and_display() {
        let mut time = RtfDateTime::default();
        time.set(DatePart::Year, 2003);
        time.set(DatePart::Month, 7);
        time.set(DatePart::Day, 14);
        time.set(DatePart::Hour, 9);
        time.set(DatePart::Minute, 5);
        assert_eq!(time.to_string(), "2003-07-14 09:05");

        time.set(DatePart::Second, 30);
        assert_eq!(time.to_string(), "2003-07-14 09:05:30");
    }

    #[test]
    fn test_numbers() {
        let mut info = DocumentInfo::new();
        info.set_number(InfoNumber::Pages, 3);
        info.set_number(InfoNumber::Words, 120);
        assert_eq!(info.pages, Some(3));
        assert_eq!(info.words, Some(120));
    }
}
