//! Upload-time text extraction.
//!
//! Dispatches on file extension to a format-specific extractor and returns
//! plain UTF-8 text. The supported set mirrors the upload formats the system
//! accepts: pdf, docx, pptx, txt, md. Anything else is rejected before the
//! corpus is touched.

mod ooxml;
mod pdf;

use thiserror::Error;

/// Errors surfaced to the upload caller. Neither variant changes the
/// published snapshot.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Extensions the upload endpoint accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "txt", "md"];

fn extension(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Whether a filename carries a recognized extension.
pub fn is_supported(name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(name).as_str())
}

/// Extracts plain text from an uploaded file.
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match extension(name).as_str() {
        "pdf" => pdf::extract(bytes),
        "docx" => ooxml::extract_docx(bytes),
        "pptx" => ooxml::extract_pptx(bytes),
        "txt" | "md" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported("report.pdf"));
        assert!(is_supported("notes.TXT"));
        assert!(is_supported("deck.pptx"));
        assert!(is_supported("contract.docx"));
        assert!(is_supported("readme.md"));
        assert!(!is_supported("archive.zip"));
        assert!(!is_supported("noextension"));
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("notes.txt", "hello corpus".as_bytes()).unwrap();
        assert_eq!(text, "hello corpus");
    }

    #[test]
    fn test_unsupported_format() {
        let err = extract_text("image.png", &[0u8; 4]).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ext) if ext == "png"));
    }

    #[test]
    fn test_invalid_pdf_reports_failure() {
        let err = extract_text("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn test_invalid_docx_reports_failure() {
        let err = extract_text("broken.docx", b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }
}
