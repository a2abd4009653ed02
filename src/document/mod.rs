pub mod docx;
pub mod export;
pub mod html;
pub mod layout;
pub mod model;
pub mod odt;
pub mod pdf;

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Html,
    /// HTML saved under a `.doc` name; word processors open it directly.
    Doc,
    Odt,
    Docx,
    Text,
    Unknown,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Doc => "doc",
            Self::Odt => "odt",
            Self::Docx => "docx",
            Self::Text => "txt",
            Self::Unknown => "",
        }
    }
}

pub fn detect_format(path: &Path) -> DocumentFormat {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => DocumentFormat::Pdf,
        Some("html" | "htm") => DocumentFormat::Html,
        Some("doc") => DocumentFormat::Doc,
        Some("odt") => DocumentFormat::Odt,
        Some("docx") => DocumentFormat::Docx,
        Some("txt") => DocumentFormat::Text,
        _ => DocumentFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_case_insensitively() {
        assert_eq!(detect_format(Path::new("a/report.PDF")), DocumentFormat::Pdf);
        assert_eq!(detect_format(Path::new("report.htm")), DocumentFormat::Html);
        assert_eq!(detect_format(Path::new("report.doc")), DocumentFormat::Doc);
        assert_eq!(detect_format(Path::new("report")), DocumentFormat::Unknown);
        assert_eq!(detect_format(Path::new("report.rtf")), DocumentFormat::Unknown);
    }
}
