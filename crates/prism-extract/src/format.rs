//! File format detection by extension.

use std::path::Path;

/// How a file's content is turned into samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Read as text (after a binary sniff)
    Text,
    /// XML or HTML: tags are stripped before matching
    Markup,
    /// Zip archive: every member is scanned recursively
    Zip,
    /// Zip-based office document: its XML parts are scanned
    OfficeXml,
}

impl Format {
    /// Detect from a lowercase extension without the dot.
    #[must_use]
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("zip") => Self::Zip,
            Some("docx" | "xlsx" | "pptx" | "odt" | "ods" | "odp") => Self::OfficeXml,
            Some("xml" | "html" | "htm" | "xhtml") => Self::Markup,
            _ => Self::Text,
        }
    }

    /// Detect from a path's extension (case-insensitive).
    #[must_use]
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        Self::from_extension(ext.as_deref())
    }

    /// Whether the format holds other files.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Zip | Self::OfficeXml)
    }

    /// Whether a container member should be scanned.
    #[must_use]
    pub fn accepts_member(self, name: &str) -> bool {
        match self {
            Self::OfficeXml => {
                let lower = name.to_ascii_lowercase();
                lower.ends_with(".xml") && !lower.ends_with("[content_types].xml")
            }
            _ => true,
        }
    }
}
