//! Output formats and the template registry.
//!
//! Each [`TargetFormat`] has a description file (`html.conf`, ...). The
//! built-in descriptions are compiled into the crate; a [`TemplateSet`] can
//! instead read them from a configuration directory. Either way a template
//! is parsed at most once per set and then shared.

use super::config::ConfigError;
use super::template::FormatTemplate;
use crate::common::error::{Error, Result};
use crate::rtf::{CHARMAP_FILE, CharMap};
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Output format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// Plain text
    Text,
    Html,
    Latex,
    /// troff with the mm macro package
    TroffMm,
    /// Text with VT100 escape sequences
    Vt,
}

impl TargetFormat {
    /// Every format, in declaration order.
    pub const ALL: [TargetFormat; 5] = [
        TargetFormat::Text,
        TargetFormat::Html,
        TargetFormat::Latex,
        TargetFormat::TroffMm,
        TargetFormat::Vt,
    ];

    /// Short name, also the stem of the description file.
    pub fn name(self) -> &'static str {
        match self {
            TargetFormat::Text => "text",
            TargetFormat::Html => "html",
            TargetFormat::Latex => "latex",
            TargetFormat::TroffMm => "troff_mm",
            TargetFormat::Vt => "vt",
        }
    }

    /// Name of the description file inside a configuration directory.
    pub fn file_name(self) -> String {
        format!("{}.conf", self.name())
    }

    /// The compiled-in description.
    pub fn builtin_description(self) -> &'static str {
        match self {
            TargetFormat::Text => include_str!("../../config/text.conf"),
            TargetFormat::Html => include_str!("../../config/html.conf"),
            TargetFormat::Latex => include_str!("../../config/latex.conf"),
            TargetFormat::TroffMm => include_str!("../../config/troff_mm.conf"),
            TargetFormat::Vt => include_str!("../../config/vt.conf"),
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(TargetFormat::Text),
            "html" => Ok(TargetFormat::Html),
            "latex" => Ok(TargetFormat::Latex),
            "troff_mm" | "troff" => Ok(TargetFormat::TroffMm),
            "vt" => Ok(TargetFormat::Vt),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Where a template set reads its descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin,
    Directory(PathBuf),
}

static BUILTIN: Lazy<Arc<TemplateSet>> = Lazy::new(|| Arc::new(TemplateSet::builtin()));

/// Lazily parsed templates for every format, plus the symbol charmap.
#[derive(Debug)]
pub struct TemplateSet {
    source: TemplateSource,
    templates: [OnceCell<Arc<FormatTemplate>>; 5],
    charmap: OnceCell<Arc<CharMap>>,
}

impl TemplateSet {
    fn with_source(source: TemplateSource) -> Self {
        Self {
            source,
            templates: Default::default(),
            charmap: OnceCell::new(),
        }
    }

    /// Set using the compiled-in descriptions.
    pub fn builtin() -> Self {
        Self::with_source(TemplateSource::Builtin)
    }

    /// Process-wide shared built-in set.
    pub fn shared() -> Arc<TemplateSet> {
        Arc::clone(&BUILTIN)
    }

    /// Set reading `<format>.conf` files from `dir`.
    ///
    /// Files are read on first use, so a missing directory surfaces as an
    /// I/O error from [`TemplateSet::get`].
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::with_source(TemplateSource::Directory(dir.into()))
    }

    #[inline]
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Template for `format`, parsed on first request.
    pub fn get(&self, format: TargetFormat) -> Result<Arc<FormatTemplate>> {
        self.templates[format.index()]
            .get_or_try_init(|| {
                let template = match &self.source {
                    TemplateSource::Builtin => {
                        FormatTemplate::parse(format.name(), format.builtin_description())?
                    },
                    TemplateSource::Directory(dir) => {
                        let path = dir.join(format.file_name());
                        log::debug!("loading {} template from {}", format, path.display());
                        let text = std::fs::read_to_string(&path)?;
                        FormatTemplate::parse(format.name(), &text)?
                    },
                };
                Ok::<_, Error>(Arc::new(template))
            })
            .cloned()
    }

    /// Symbol font charmap. A directory without `SYMBOL.charmap` uses the
    /// built-in map.
    pub fn charmap(&self) -> Result<Arc<CharMap>> {
        self.charmap
            .get_or_try_init(|| match &self.source {
                TemplateSource::Builtin => Ok(CharMap::builtin()),
                TemplateSource::Directory(dir) => load_charmap(dir),
            })
            .cloned()
    }
}

fn load_charmap(dir: &Path) -> Result<Arc<CharMap>> {
    let path = dir.join(CHARMAP_FILE);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            log::debug!("loading symbol charmap from {}", path.display());
            let map = CharMap::parse(&text).map_err(Error::Config)?;
            Ok(Arc::new(map))
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CharMap::builtin()),
        Err(err) => Err(err.into()),
    }
}

/// Parse every built-in description, returning the first failure.
pub fn check_builtin() -> std::result::Result<(), ConfigError> {
    for format in TargetFormat::ALL {
        FormatTemplate::parse(format.name(), format.builtin_description())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::template::TemplateKey;
    use std::fs;

    #[test]
    fn test_format_names_round_trip() {
        for format in TargetFormat::ALL {
            assert_eq!(format.name().parse::<TargetFormat>(), Ok(format));
            assert_eq!(format.to_string(), format.name());
        }
        assert_eq!("TROFF".parse::<TargetFormat>(), Ok(TargetFormat::TroffMm));
        assert!("rtf".parse::<TargetFormat>().is_err());
        assert_eq!(TargetFormat::Latex.file_name(), "latex.conf");
    }

    #[test]
    fn test_builtin_descriptions_parse() {
        check_builtin().unwrap();
        let set = TemplateSet::builtin();
        for format in TargetFormat::ALL {
            let template = set.get(format).unwrap();
            assert_eq!(template.name(), format.name());
        }
        let html = set.get(TargetFormat::Html).unwrap();
        assert!(html.supports(TemplateKey::HyperlinkBegin));
        assert_eq!(html.escape_char('<'), Some("&lt;"));
    }

    #[test]
    fn test_templates_are_shared() {
        let set = TemplateSet::shared();
        let a = set.get(TargetFormat::Vt).unwrap();
        let b = set.get(TargetFormat::Vt).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_directory_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("text.conf"),
            "prologue [\nepilogue ]\nbold-on *\nbold-off *\nitalic-on _\nitalic-off _\nparagraph-break %n\n",
        )
        .unwrap();

        let set = TemplateSet::from_dir(dir.path());
        let text = set.get(TargetFormat::Text).unwrap();
        assert_eq!(text.get(TemplateKey::BoldOn).map(|l| l.is_empty()), Some(false));

        // No html.conf in the directory
        assert!(matches!(set.get(TargetFormat::Html), Err(Error::Io(_))));

        // No charmap either, so the built-in one is used
        let charmap = set.charmap().unwrap();
        assert!(Arc::ptr_eq(&charmap, &CharMap::builtin()));
    }

    #[test]
    fn test_directory_template_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("html.conf"),
            "prologue\nepilogue\nbold-off </b>\nitalic-on <i>\nitalic-off </i>\nparagraph-break <p>\n",
        )
        .unwrap();

        let set = TemplateSet::from_dir(dir.path());
        let err = set.get(TargetFormat::Html).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_directory_charmap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CHARMAP_FILE), "0x61 U+2200\n").unwrap();

        let set = TemplateSet::from_dir(dir.path());
        let charmap = set.charmap().unwrap();
        let mut out = String::new();
        charmap.decode(b"ab", None, &mut out);
        assert_eq!(out, "\u{2200}b");

        fs::write(dir.path().join(CHARMAP_FILE), "0x61\n").unwrap();
        let set = TemplateSet::from_dir(dir.path());
        assert!(set.charmap().unwrap_err().is_config());
    }
}
