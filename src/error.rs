use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display_keeps_message() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let error = Error::Io(io_error);
        let display = error.to_string();
        assert!(display.contains("IO error"));
        assert!(display.contains("read-only volume"));
    }

    #[test]
    fn json_error_converts() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn unsupported_format_display() {
        let error = Error::UnsupportedFormat("rtf".to_string());
        assert_eq!(error.to_string(), "Unsupported format: rtf");
    }
}
