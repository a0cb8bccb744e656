//! Control-word dispatch table.
//!
//! Maps every control word the converter understands to the action the
//! parser takes for it and to the way its numeric parameter is read. The
//! table is a compile-time perfect hash map; lookups are exact and case
//! sensitive. Words missing from the table are not errors: they are ignored,
//! except directly after `\*` where they make the parser skip their group.

use super::info::{DateField, DatePart, InfoField, InfoNumber};
use super::picture::{ImageType, PictureProp};
use super::types::{Alignment, CharFlags, FontFamily, UnderlineStyle};
use phf::phf_map;

/// Identifies the revision of the keyword set.
pub const KEYWORD_SET_VERSION: &str = "rtf-1.9.1/1";

/// How a control word's numeric parameter is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Parameter is meaningless and ignored
    None,
    /// Parameter must be present; the word is ignored without one
    Required,
    /// Parameter may be omitted, in which case the default applies
    Optional(i32),
    /// On/off toggle: absent or non-zero turns on, zero turns off
    Flag,
}

/// Document character set named in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCharset {
    Ansi,
    Mac,
    Pc,
    Pca,
}

/// Group types that redirect the text they contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    FontTable,
    ColorTable,
    Info,
    InfoText(InfoField),
    InfoDate(DateField),
    Picture,
    /// `\shppict`: a picture wrapper that is otherwise transparent
    ShapePicture,
    /// Content hidden from output, though nested groups may re-enable it
    Object,
    /// `\result` of an object, rendered
    ObjectResult,
    Field,
    FieldInstruction,
    FieldResult,
    Footnote,
    /// `\upr`: ANSI text with a Unicode alternative inside
    UnicodeAlternate,
    /// `\ud`: the Unicode alternative of `\upr`
    UnicodeText,
    /// Skipped entirely, nested groups included
    Skip,
}

/// What the parser does for a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Document
    Rtf,
    Charset(DocumentCharset),
    AnsiCodePage,
    DefaultFont,
    UnicodeSkip,
    Unicode,

    // Groups
    Destination(Destination),

    // Font table entries
    FontCharset,
    FontCodePage,
    FontFamily(FontFamily),

    // Color table entries
    Red,
    Green,
    Blue,

    // Character formatting
    Plain,
    Flag(CharFlags),
    Underline(UnderlineStyle),
    NoSuperSub,
    Font,
    FontSize,
    Foreground,
    Background,
    Expand,
    ExpandTwips,
    Language,

    // Paragraph formatting
    Pard,
    Align(Alignment),
    InTable,

    // Breaks and characters
    Par,
    Line,
    Page,
    Section,
    Tab,
    Char(char),
    FootnoteMark,

    // Tables
    RowDefaults,
    Cell,
    Row,

    // Pictures
    PictureType(ImageType),
    PictureProp(PictureProp),

    // Info
    InfoNumber(InfoNumber),
    DatePart(DatePart),

    /// Known but without effect on the output
    Ignore,
}

/// Table entry for one control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordEntry {
    pub action: Action,
    pub param: ParamKind,
}

const fn entry(action: Action, param: ParamKind) -> KeywordEntry {
    KeywordEntry { action, param }
}

const fn plain(action: Action) -> KeywordEntry {
    entry(action, ParamKind::None)
}

const fn dest(destination: Destination) -> KeywordEntry {
    entry(Action::Destination(destination), ParamKind::None)
}

const fn flag(flags: CharFlags) -> KeywordEntry {
    entry(Action::Flag(flags), ParamKind::Flag)
}

const fn underline(style: UnderlineStyle) -> KeywordEntry {
    entry(Action::Underline(style), ParamKind::Flag)
}

const fn required(action: Action) -> KeywordEntry {
    entry(action, ParamKind::Required)
}

const fn character(ch: char) -> KeywordEntry {
    plain(Action::Char(ch))
}

static KEYWORDS: phf::Map<&'static str, KeywordEntry> = phf_map! {
    // Document and character set
    "rtf" => entry(Action::Rtf, ParamKind::Optional(1)),
    "ansi" => plain(Action::Charset(DocumentCharset::Ansi)),
    "mac" => plain(Action::Charset(DocumentCharset::Mac)),
    "pc" => plain(Action::Charset(DocumentCharset::Pc)),
    "pca" => plain(Action::Charset(DocumentCharset::Pca)),
    "ansicpg" => required(Action::AnsiCodePage),
    "deff" => required(Action::DefaultFont),
    "uc" => entry(Action::UnicodeSkip, ParamKind::Optional(1)),
    "u" => required(Action::Unicode),

    // Destinations
    "fonttbl" => dest(Destination::FontTable),
    "colortbl" => dest(Destination::ColorTable),
    "stylesheet" => dest(Destination::Skip),
    "info" => dest(Destination::Info),
    "title" => dest(Destination::InfoText(InfoField::Title)),
    "subject" => dest(Destination::InfoText(InfoField::Subject)),
    "author" => dest(Destination::InfoText(InfoField::Author)),
    "manager" => dest(Destination::InfoText(InfoField::Manager)),
    "company" => dest(Destination::InfoText(InfoField::Company)),
    "operator" => dest(Destination::InfoText(InfoField::Operator)),
    "category" => dest(Destination::InfoText(InfoField::Category)),
    "keywords" => dest(Destination::InfoText(InfoField::Keywords)),
    "comment" => dest(Destination::InfoText(InfoField::Comment)),
    "doccomm" => dest(Destination::InfoText(InfoField::DocComment)),
    "hlinkbase" => dest(Destination::InfoText(InfoField::HyperlinkBase)),
    "creatim" => dest(Destination::InfoDate(DateField::Creation)),
    "revtim" => dest(Destination::InfoDate(DateField::Revision)),
    "printim" => dest(Destination::InfoDate(DateField::Print)),
    "buptim" => dest(Destination::InfoDate(DateField::Backup)),
    "pict" => dest(Destination::Picture),
    "shppict" => dest(Destination::ShapePicture),
    "nonshppict" => dest(Destination::Skip),
    "object" => dest(Destination::Object),
    "result" => dest(Destination::ObjectResult),
    "field" => dest(Destination::Field),
    "fldinst" => dest(Destination::FieldInstruction),
    "fldrslt" => dest(Destination::FieldResult),
    "footnote" => dest(Destination::Footnote),
    "upr" => dest(Destination::UnicodeAlternate),
    "ud" => dest(Destination::UnicodeText),

    // Destinations with nothing to render
    "header" => dest(Destination::Skip),
    "headerl" => dest(Destination::Skip),
    "headerr" => dest(Destination::Skip),
    "headerf" => dest(Destination::Skip),
    "footer" => dest(Destination::Skip),
    "footerl" => dest(Destination::Skip),
    "footerr" => dest(Destination::Skip),
    "footerf" => dest(Destination::Skip),
    "ftnsep" => dest(Destination::Skip),
    "ftnsepc" => dest(Destination::Skip),
    "ftncn" => dest(Destination::Skip),
    "aftnsep" => dest(Destination::Skip),
    "aftnsepc" => dest(Destination::Skip),
    "aftncn" => dest(Destination::Skip),
    "annotation" => dest(Destination::Skip),
    "atnid" => dest(Destination::Skip),
    "atnauthor" => dest(Destination::Skip),
    "listtable" => dest(Destination::Skip),
    "listoverridetable" => dest(Destination::Skip),
    "revtbl" => dest(Destination::Skip),
    "rsidtbl" => dest(Destination::Skip),
    "filetbl" => dest(Destination::Skip),
    "generator" => dest(Destination::Skip),
    "xmlnstbl" => dest(Destination::Skip),
    "themedata" => dest(Destination::Skip),
    "colorschememapping" => dest(Destination::Skip),
    "datastore" => dest(Destination::Skip),
    "latentstyles" => dest(Destination::Skip),
    "pgdsctbl" => dest(Destination::Skip),
    "objdata" => dest(Destination::Skip),
    "objclass" => dest(Destination::Skip),
    "objname" => dest(Destination::Skip),
    "picprop" => dest(Destination::Skip),
    "blipuid" => dest(Destination::Skip),
    "falt" => dest(Destination::Skip),
    "panose" => dest(Destination::Skip),
    "fontemb" => dest(Destination::Skip),
    "fontfile" => dest(Destination::Skip),
    "fldtype" => dest(Destination::Skip),
    "bkmkstart" => dest(Destination::Skip),
    "bkmkend" => dest(Destination::Skip),
    "pn" => dest(Destination::Skip),
    "pntext" => dest(Destination::Skip),
    "pntxta" => dest(Destination::Skip),
    "pntxtb" => dest(Destination::Skip),
    "tc" => dest(Destination::Skip),
    "xe" => dest(Destination::Skip),
    "txe" => dest(Destination::Skip),
    "nesttableprops" => dest(Destination::Skip),
    "nonesttables" => dest(Destination::Skip),
    "template" => dest(Destination::Skip),
    "private" => dest(Destination::Skip),

    // Font table entries
    "fcharset" => required(Action::FontCharset),
    "cpg" => required(Action::FontCodePage),
    "fnil" => plain(Action::FontFamily(FontFamily::Nil)),
    "froman" => plain(Action::FontFamily(FontFamily::Roman)),
    "fswiss" => plain(Action::FontFamily(FontFamily::Swiss)),
    "fmodern" => plain(Action::FontFamily(FontFamily::Modern)),
    "fscript" => plain(Action::FontFamily(FontFamily::Script)),
    "fdecor" => plain(Action::FontFamily(FontFamily::Decor)),
    "ftech" => plain(Action::FontFamily(FontFamily::Tech)),
    "fbidi" => plain(Action::FontFamily(FontFamily::Bidi)),
    "fprq" => plain(Action::Ignore),

    // Color table entries
    "red" => required(Action::Red),
    "green" => required(Action::Green),
    "blue" => required(Action::Blue),

    // Character formatting
    "plain" => plain(Action::Plain),
    "b" => flag(CharFlags::BOLD),
    "i" => flag(CharFlags::ITALIC),
    "strike" => flag(CharFlags::STRIKE),
    "striked" => flag(CharFlags::DOUBLE_STRIKE),
    "super" => flag(CharFlags::SUPERSCRIPT),
    "sub" => flag(CharFlags::SUBSCRIPT),
    "up" => flag(CharFlags::SUPERSCRIPT),
    "dn" => flag(CharFlags::SUBSCRIPT),
    "nosupersub" => plain(Action::NoSuperSub),
    "scaps" => flag(CharFlags::SMALL_CAPS),
    "caps" => flag(CharFlags::ALL_CAPS),
    "v" => flag(CharFlags::HIDDEN),
    "outl" => flag(CharFlags::OUTLINE),
    "shad" => flag(CharFlags::SHADOW),
    "embo" => flag(CharFlags::EMBOSS),
    "impr" => flag(CharFlags::ENGRAVE),
    "ul" => underline(UnderlineStyle::Single),
    "uld" => underline(UnderlineStyle::Dotted),
    "uldb" => underline(UnderlineStyle::Double),
    "ulw" => underline(UnderlineStyle::Words),
    "ulth" => underline(UnderlineStyle::Thick),
    "ulwave" => underline(UnderlineStyle::Wave),
    "uldash" => underline(UnderlineStyle::Dashed),
    "uldashd" => underline(UnderlineStyle::DashDot),
    "uldashdd" => underline(UnderlineStyle::DashDotDot),
    "ulnone" => underline(UnderlineStyle::None),
    "f" => required(Action::Font),
    "fs" => entry(Action::FontSize, ParamKind::Optional(24)),
    "cf" => required(Action::Foreground),
    "cb" => required(Action::Background),
    "highlight" => required(Action::Background),
    "chcbpat" => required(Action::Background),
    "expnd" => required(Action::Expand),
    "expndtw" => required(Action::ExpandTwips),
    "lang" => required(Action::Language),

    // Paragraph formatting
    "pard" => plain(Action::Pard),
    "ql" => plain(Action::Align(Alignment::Left)),
    "qr" => plain(Action::Align(Alignment::Right)),
    "qc" => plain(Action::Align(Alignment::Center)),
    "qj" => plain(Action::Align(Alignment::Justify)),
    "intbl" => plain(Action::InTable),

    // Breaks
    "par" => plain(Action::Par),
    "line" => plain(Action::Line),
    "page" => plain(Action::Page),
    "sect" => plain(Action::Section),
    "tab" => plain(Action::Tab),
    "sectd" => plain(Action::Ignore),

    // Special characters
    "emdash" => character('\u{2014}'),
    "endash" => character('\u{2013}'),
    "emspace" => character('\u{2003}'),
    "enspace" => character('\u{2002}'),
    "qmspace" => character('\u{2005}'),
    "bullet" => character('\u{2022}'),
    "lquote" => character('\u{2018}'),
    "rquote" => character('\u{2019}'),
    "ldblquote" => character('\u{201C}'),
    "rdblquote" => character('\u{201D}'),
    "zwj" => character('\u{200D}'),
    "zwnj" => character('\u{200C}'),
    "zwbo" => character('\u{200B}'),
    "ltrmark" => character('\u{200E}'),
    "rtlmark" => character('\u{200F}'),
    "chftn" => plain(Action::FootnoteMark),

    // Tables
    "trowd" => plain(Action::RowDefaults),
    "cell" => plain(Action::Cell),
    "row" => plain(Action::Row),
    "nestcell" => plain(Action::Cell),
    "nestrow" => plain(Action::Row),

    // Pictures
    "emfblip" => plain(Action::PictureType(ImageType::Emf)),
    "pngblip" => plain(Action::PictureType(ImageType::Png)),
    "jpegblip" => plain(Action::PictureType(ImageType::Jpeg)),
    "macpict" => plain(Action::PictureType(ImageType::Pict)),
    "pmmetafile" => plain(Action::PictureType(ImageType::Os2Metafile)),
    "wmetafile" => plain(Action::PictureType(ImageType::Wmf)),
    "dibitmap" => plain(Action::PictureType(ImageType::Dib)),
    "wbitmap" => plain(Action::PictureType(ImageType::Bitmap)),
    "picw" => required(Action::PictureProp(PictureProp::Width)),
    "pich" => required(Action::PictureProp(PictureProp::Height)),
    "picwgoal" => required(Action::PictureProp(PictureProp::GoalWidth)),
    "pichgoal" => required(Action::PictureProp(PictureProp::GoalHeight)),
    "picscalex" => required(Action::PictureProp(PictureProp::ScaleX)),
    "picscaley" => required(Action::PictureProp(PictureProp::ScaleY)),

    // Info numbers and timestamps
    "version" => required(Action::InfoNumber(InfoNumber::Version)),
    "vern" => required(Action::InfoNumber(InfoNumber::InternalVersion)),
    "edmins" => required(Action::InfoNumber(InfoNumber::EditingMinutes)),
    "nofpages" => required(Action::InfoNumber(InfoNumber::Pages)),
    "nofwords" => required(Action::InfoNumber(InfoNumber::Words)),
    "nofchars" => required(Action::InfoNumber(InfoNumber::Characters)),
    "nofcharsws" => required(Action::InfoNumber(InfoNumber::CharactersWithSpaces)),
    "id" => required(Action::InfoNumber(InfoNumber::Id)),
    "yr" => required(Action::DatePart(DatePart::Year)),
    "mo" => required(Action::DatePart(DatePart::Month)),
    "dy" => required(Action::DatePart(DatePart::Day)),
    "hr" => required(Action::DatePart(DatePart::Hour)),
    "min" => required(Action::DatePart(DatePart::Minute)),
    "sec" => required(Action::DatePart(DatePart::Second)),
};

/// Look up a control word.
#[inline]
pub fn lookup(name: &str) -> Option<&'static KeywordEntry> {
    KEYWORDS.get(name)
}

/// Number of control words in the table.
#[inline]
pub fn keyword_count() -> usize {
    KEYWORDS.len()
}
