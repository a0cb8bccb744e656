//! Conversion options.

use crate::rtf::DEFAULT_MAX_DEPTH;
use std::path::PathBuf;

/// Environment variable naming a configuration directory.
pub const CONFIG_DIR_ENV: &str = "UNRTF_CONFIG_DIR";

/// Options for RTF conversion.
///
/// # Examples
///
/// ```rust
/// use unrtf::ConvertOptions;
///
/// // Create with defaults
/// let options = ConvertOptions::default();
///
/// // Or customize
/// let options = ConvertOptions::new()
///     .with_suppress_pictures(true)
///     .with_max_depth(256)
///     .with_replacement(None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Skip pictures entirely instead of rendering placeholders
    pub suppress_pictures: bool,
    /// Deepest group nesting accepted before the conversion fails
    pub max_depth: usize,
    /// Substitute for undecodable input bytes; `None` drops them
    pub replacement: Option<char>,
    /// Directory holding `<format>.conf` files and `SYMBOL.charmap`.
    /// `None` uses the built-in descriptions.
    pub config_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            suppress_pictures: false,
            max_depth: DEFAULT_MAX_DEPTH,
            replacement: Some('?'),
            config_dir: None,
        }
    }
}

impl ConvertOptions {
    /// Create a new `ConvertOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the configuration directory taken from
    /// `UNRTF_CONFIG_DIR` when it is set and not empty.
    pub fn from_env() -> Self {
        let config_dir = std::env::var_os(CONFIG_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        if let Some(dir) = &config_dir {
            log::debug!("using configuration directory {}", dir.display());
        }
        Self {
            config_dir,
            ..Self::default()
        }
    }

    /// Set whether pictures are dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unrtf::ConvertOptions;
    ///
    /// let options = ConvertOptions::new().with_suppress_pictures(true);
    /// ```
    #[inline]
    pub fn with_suppress_pictures(mut self, suppress: bool) -> Self {
        self.suppress_pictures = suppress;
        self
    }

    /// Set the nesting limit.
    #[inline]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the substitute for undecodable input.
    #[inline]
    pub fn with_replacement(mut self, replacement: Option<char>) -> Self {
        self.replacement = replacement;
        self
    }

    /// Read format descriptions from `dir`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unrtf::ConvertOptions;
    ///
    /// let options = ConvertOptions::new().with_config_dir("/usr/share/unrtf");
    /// ```
    #[inline]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = ConvertOptions::new()
            .with_suppress_pictures(true)
            .with_max_depth(16)
            .with_replacement(None)
            .with_config_dir("conf");
        assert!(options.suppress_pictures);
        assert_eq!(options.max_depth, 16);
        assert_eq!(options.replacement, None);
        assert_eq!(options.config_dir, Some(PathBuf::from("conf")));
    }

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert!(!options.suppress_pictures);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(options.replacement, Some('?'));
        assert!(options.config_dir.is_none());
    }
}
