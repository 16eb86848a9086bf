//! OOXML (docx/pptx) text extraction.
//!
//! Both formats are ZIP archives of XML parts. Text lives in `<w:t>` runs
//! (Word) and `<a:t>` runs (PowerPoint); paragraphs map to `<w:p>` / `<a:p>`.
//! Runs are concatenated per paragraph and paragraphs joined with newlines.

use std::io::Read;

use super::ExtractError;

/// Cap on decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

fn ooxml_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::ExtractionFailed(format!("ooxml: {e}"))
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)
}

fn read_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_err(format!("{name} exceeds size limit")));
    }
    Ok(out)
}

/// Walks one XML part, appending the contents of every `<{tag}>` text run and
/// a newline at each paragraph end.
fn collect_text_runs(xml: &[u8], out: &mut String) -> Result<(), ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text_run = false;
                } else if name.as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Extracts the body text of a Word document.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;
    let mut out = String::new();
    collect_text_runs(&xml, &mut out)?;
    Ok(out)
}

/// Extracts the text of every slide of a presentation, slides in numeric
/// order.
pub fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut out = String::new();
    for name in slide_names {
        let xml = read_entry(&mut archive, &name)?;
        collect_text_runs(&xml, &mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with_entry(name: &str, xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_docx_text_runs_and_paragraphs() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t> world</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let bytes = zip_with_entry("word/document.xml", xml);
        let text = extract_docx(&bytes).unwrap();
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
        // Paragraph boundary became a newline
        assert!(text.contains("world\n"));
    }

    #[test]
    fn test_docx_without_document_part_fails() {
        let bytes = zip_with_entry("word/styles.xml", "<w:styles/>");
        assert!(extract_docx(&bytes).is_err());
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            // slide10 first in the archive; numeric sort must still put slide2 before it
            for (name, body) in [
                ("ppt/slides/slide10.xml", "ten"),
                ("ppt/slides/slide2.xml", "two"),
            ] {
                let xml = format!(
                    r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:p><a:r><a:t>{body}</a:t></a:r></a:p></p:sld>"#
                );
                writer
                    .start_file(name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(xml.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        let text = extract_pptx(&cursor.into_inner()).unwrap();
        let two = text.find("two").unwrap();
        let ten = text.find("ten").unwrap();
        assert!(two < ten, "slide2 text must precede slide10 text: {text:?}");
    }

    #[test]
    fn test_not_a_zip_fails() {
        assert!(extract_docx(b"plain bytes").is_err());
        assert!(extract_pptx(b"plain bytes").is_err());
    }
}
