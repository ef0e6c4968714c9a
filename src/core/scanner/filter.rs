//! Filename filtering for the scanner.

use std::path::Path;

/// Accepts files whose name ends with one of a list of suffixes
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    /// Suffixes including the dot, compared case-sensitively
    extensions: Vec<String>,
    include_hidden: bool,
}

impl ExtensionFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include dotfiles such as `._IMG_0001.JPG`
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        self.matches_name(name)
    }

    /// Suffix test alone, ignoring the hidden-file rule
    pub fn matches_name(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| !ext.is_empty() && name.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_only() -> ExtensionFilter {
        ExtensionFilter::new(&[".jpg", ".jpeg"])
    }

    #[test]
    fn filter_includes_listed_suffix() {
        assert!(jpeg_only().should_include(Path::new("/photos/image.jpg")));
        assert!(jpeg_only().should_include(Path::new("/photos/image.jpeg")));
    }

    #[test]
    fn filter_is_case_sensitive() {
        assert!(!jpeg_only().should_include(Path::new("/photos/IMG_1234.JPG")));

        let both = ExtensionFilter::new(&[".jpg", ".JPG"]);
        assert!(both.should_include(Path::new("/photos/IMG_1234.JPG")));
    }

    #[test]
    fn filter_excludes_other_files() {
        assert!(!jpeg_only().should_include(Path::new("/photos/document.pdf")));
        assert!(!jpeg_only().should_include(Path::new("/photos/image.jpg.json")));
        assert!(!jpeg_only().should_include(Path::new("/photos/no_extension")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        assert!(!jpeg_only().should_include(Path::new("/photos/.hidden.jpg")));
        assert!(jpeg_only()
            .with_hidden(true)
            .should_include(Path::new("/photos/.hidden.jpg")));
    }

    #[test]
    fn empty_extension_never_matches() {
        let filter = ExtensionFilter::new(&[""]);
        assert!(!filter.should_include(Path::new("/photos/image.jpg")));
    }
}
