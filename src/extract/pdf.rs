//! PDF text extraction via lopdf.

use super::ExtractError;

/// Extracts the text of every page, pages joined with newlines.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractError::ExtractionFailed(format!("pdf parse: {e}")))?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Err(ExtractError::ExtractionFailed(
            "pdf contains no pages".to_string(),
        ));
    }

    let mut out = String::new();
    for page in pages {
        let text = doc
            .extract_text(&[page])
            .map_err(|e| ExtractError::ExtractionFailed(format!("pdf page {page}: {e}")))?;
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(extract(b"definitely not a pdf").is_err());
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(extract(&[]).is_err());
    }
}
