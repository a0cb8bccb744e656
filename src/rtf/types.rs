//! RTF formatting state and document tables.

use bitflags::bitflags;

/// Font reference (index into font table).
pub type FontRef = u16;

/// Color reference (index into color table).
pub type ColorRef = u16;

/// Default font size in half-points (12pt).
pub const DEFAULT_FONT_SIZE: u16 = 24;

/// RTF color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    /// Red component (0-255)
    pub red: u8,
    /// Green component (0-255)
    pub green: u8,
    /// Blue component (0-255)
    pub blue: u8,
}

impl Color {
    /// Create a new color.
    #[inline]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Format as `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// Color table containing document colors.
///
/// An entry is `None` when the document left it empty, which RTF uses for
/// the "automatic" color (normally entry 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    colors: Vec<Option<Color>>,
}

impl ColorTable {
    /// Create a new color table.
    #[inline]
    pub fn new() -> Self {
        Self { colors: Vec::new() }
    }

    /// Add an entry to the table and return its index.
    #[inline]
    pub fn push(&mut self, color: Option<Color>) -> ColorRef {
        let index = self.colors.len() as ColorRef;
        self.colors.push(color);
        index
    }

    /// Get a color by reference. Automatic and missing entries yield `None`.
    #[inline]
    pub fn get(&self, color_ref: ColorRef) -> Option<Color> {
        self.colors.get(color_ref as usize).copied().flatten()
    }

    /// Number of entries, automatic ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Font family categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    /// Nil (unknown or default)
    #[default]
    Nil,
    /// Roman (serif) fonts
    Roman,
    /// Swiss (sans-serif) fonts
    Swiss,
    /// Modern (monospace) fonts
    Modern,
    /// Script fonts
    Script,
    /// Decorative fonts
    Decor,
    /// Technical, symbol, and mathematical fonts
    Tech,
    /// Bidirectional fonts
    Bidi,
}

/// Font definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Font {
    /// Font name
    pub name: String,
    /// Font family category
    pub family: FontFamily,
    /// `\fcharset` value, if given
    pub charset: Option<i32>,
    /// `\cpg` codepage, if given
    pub codepage: Option<u32>,
}

impl Font {
    /// Whether text in this font uses the Symbol character set.
    pub fn is_symbol(&self) -> bool {
        self.charset == Some(crate::common::encoding::SYMBOL_CHARSET)
            || self.name.eq_ignore_ascii_case("Symbol")
    }
}

/// Font table containing document fonts, keyed by their `\fN` number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontTable {
    fonts: Vec<(FontRef, Font)>,
}

impl FontTable {
    /// Create a new font table.
    #[inline]
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Add a font, replacing any earlier definition with the same number.
    pub fn insert(&mut self, index: FontRef, font: Font) {
        match self.fonts.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = font,
            None => self.fonts.push((index, font)),
        }
    }

    /// Get a font by reference.
    #[inline]
    pub fn get(&self, font_ref: FontRef) -> Option<&Font> {
        self.fonts
            .iter()
            .find(|(i, _)| *i == font_ref)
            .map(|(_, f)| f)
    }

    /// Number of fonts.
    #[inline]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Alignment {
    /// Left-aligned
    #[default]
    Left,
    /// Right-aligned
    Right,
    /// Centered
    Center,
    /// Justified
    Justify,
}

/// Underline style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum UnderlineStyle {
    /// No underline
    #[default]
    None,
    /// Single underline
    Single,
    /// Double underline
    Double,
    /// Dotted underline
    Dotted,
    /// Dashed underline
    Dashed,
    /// Dash-dot underline
    DashDot,
    /// Dash-dot-dot underline
    DashDotDot,
    /// Word-only underline
    Words,
    /// Thick underline
    Thick,
    /// Wave underline
    Wave,
}

bitflags! {
    /// On/off character properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharFlags: u16 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const STRIKE = 1 << 2;
        const DOUBLE_STRIKE = 1 << 3;
        const SUPERSCRIPT = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SMALL_CAPS = 1 << 6;
        const ALL_CAPS = 1 << 7;
        const HIDDEN = 1 << 8;
        const OUTLINE = 1 << 9;
        const SHADOW = 1 << 10;
        const EMBOSS = 1 << 11;
        const ENGRAVE = 1 << 12;
    }
}

/// Snapshot of the formatting active at one point of the document.
///
/// Frames are shared between nested groups through `Rc` and copied only
/// when a group changes a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeFrame {
    /// Font reference
    pub font: FontRef,
    /// Font size in half-points
    pub font_size: u16,
    /// On/off character properties
    pub flags: CharFlags,
    /// Underline style
    pub underline: UnderlineStyle,
    /// Foreground color reference, 0 is automatic
    pub foreground: ColorRef,
    /// Background/highlight color reference, 0 is none
    pub background: ColorRef,
    /// Character spacing expansion in quarter-points
    pub expand: i32,
    /// Language identifier
    pub language: Option<u16>,
    /// Paragraph alignment
    pub alignment: Alignment,
    /// Paragraph is part of a table
    pub in_table: bool,
}

impl Default for AttributeFrame {
    fn default() -> Self {
        Self::with_font(0)
    }
}

impl AttributeFrame {
    /// Default frame using `font` as its font.
    pub fn with_font(font: FontRef) -> Self {
        Self {
            font,
            font_size: DEFAULT_FONT_SIZE,
            flags: CharFlags::empty(),
            underline: UnderlineStyle::None,
            foreground: 0,
            background: 0,
            expand: 0,
            language: None,
            alignment: Alignment::Left,
            in_table: false,
        }
    }

    /// Reset character properties (`\plain`), keeping paragraph properties.
    pub fn reset_character(&mut self, default_font: FontRef) {
        let alignment = self.alignment;
        let in_table = self.in_table;
        *self = Self::with_font(default_font);
        self.alignment = alignment;
        self.in_table = in_table;
    }

    /// Reset paragraph properties (`\pard`), keeping character properties.
    pub fn reset_paragraph(&mut self) {
        self.alignment = Alignment::Left;
        self.in_table = false;
    }

    /// Turn a flag on or off. Superscript and subscript exclude each other.
    pub fn set_flag(&mut self, flag: CharFlags, on: bool) {
        if on {
            if flag.contains(CharFlags::SUPERSCRIPT) {
                self.flags.remove(CharFlags::SUBSCRIPT);
            }
            if flag.contains(CharFlags::SUBSCRIPT) {
                self.flags.remove(CharFlags::SUPERSCRIPT);
            }
        }
        self.flags.set(flag, on);
    }

    /// Whether text under this frame is hidden (`\v`).
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(CharFlags::HIDDEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table_auto_entry() {
        let mut table = ColorTable::new();
        table.push(None);
        table.push(Some(Color::new(255, 0, 0)));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(1), Some(Color::new(255, 0, 0)));
        assert_eq!(table.get(7), None);
        assert_eq!(table.len(), 2);
        assert_eq!(Color::new(255, 0, 16).to_hex(), "#ff0010");
    }

    #[test]
    fn test_font_table_sparse_indices() {
        let mut table = FontTable::new();
        table.insert(
            5,
            Font {
                name: "Arial".to_string(),
                ..Default::default()
            },
        );
        table.insert(
            0,
            Font {
                name: "Times".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(table.get(5).map(|f| f.name.as_str()), Some("Arial"));
        assert_eq!(table.get(1), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_symbol_font_detection() {
        let by_charset = Font {
            name: "Whatever".to_string(),
            charset: Some(2),
            ..Default::default()
        };
        let by_name = Font {
            name: "symbol".to_string(),
            ..Default::default()
        };
        assert!(by_charset.is_symbol());
        assert!(by_name.is_symbol());
        assert!(!Font::default().is_symbol());
    }

    #[test]
    fn test_super_clears_sub() {
        let mut frame = AttributeFrame::default();
        frame.set_flag(CharFlags::SUBSCRIPT, true);
        frame.set_flag(CharFlags::SUPERSCRIPT, true);
        assert!(frame.flags.contains(CharFlags::SUPERSCRIPT));
        assert!(!frame.flags.contains(CharFlags::SUBSCRIPT));
    }

    #[test]
    fn test_plain_keeps_paragraph_state() {
        let mut frame = AttributeFrame::default();
        frame.alignment = Alignment::Center;
        frame.in_table = true;
        frame.set_flag(CharFlags::BOLD, true);
        frame.font_size = 40;
        frame.reset_character(3);
        assert_eq!(frame.font, 3);
        assert_eq!(frame.font_size, DEFAULT_FONT_SIZE);
        assert!(frame.flags.is_empty());
        assert_eq!(frame.alignment, Alignment::Center);
        assert!(frame.in_table);
    }
}
