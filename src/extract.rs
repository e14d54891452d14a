//! Best-effort text extraction for uploaded documents.
//!
//! Extraction never fails: decoder errors are swallowed (with a warning)
//! and reported as empty text, so a malformed upload resolves to the single
//! "no readable text" validation path at ingestion instead of leaking
//! format-specific failures. Format selection prefers the filename
//! extension, then the declared media type, then a plain-text decode chain
//! (strict UTF-8, Latin-1 for clean non-UTF-8 payloads, lossy UTF-8 last).

use std::io::Read;
use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Image extensions we recognize but cannot OCR; they extract to empty text.
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract plain text from raw bytes. Returns an empty string when nothing
/// readable can be produced; never errors.
pub fn extract_text(bytes: &[u8], content_type: Option<&str>, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = extension.as_deref() {
        match ext {
            "pdf" => return extract_pdf(bytes),
            "docx" => return extract_docx(bytes),
            e if IMAGE_EXTENSIONS.contains(&e) => return String::new(),
            _ => {}
        }
    }

    match content_type {
        Some(MIME_PDF) => extract_pdf(bytes),
        Some(MIME_DOCX) => extract_docx(bytes),
        Some(ct) if ct.starts_with("image/") => String::new(),
        _ => decode_text(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("pdf extraction failed: {}", e);
            String::new()
        }
    }
}

fn extract_docx(bytes: &[u8]) -> String {
    match try_extract_docx(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("docx extraction failed: {}", e);
            String::new()
        }
    }
}

fn try_extract_docx(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let entry = archive.by_name("word/document.xml")?;
    let mut doc_xml = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut doc_xml)?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        anyhow::bail!("word/document.xml exceeds size limit");
    }
    extract_w_t_elements(&doc_xml)
}

/// Collect the text runs (`w:t` elements) from a WordprocessingML body,
/// inserting a newline at each paragraph boundary.
fn extract_w_t_elements(xml: &[u8]) -> anyhow::Result<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => anyhow::bail!("malformed document.xml: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Plain-text decode chain: strict UTF-8, then Latin-1 when the payload is
/// free of control bytes, then lossy UTF-8 as a last resort.
fn decode_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) if looks_textual(bytes) => bytes.iter().map(|&b| b as char).collect(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn looks_textual(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|&b| b == b'\t' || b == b'\n' || b == b'\r' || b >= 0x20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let text = extract_text("héllo wörld".as_bytes(), Some("text/plain"), "note.txt");
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn latin1_fallback_for_clean_non_utf8() {
        // 0xE9 is 'é' in Latin-1 and invalid as a standalone UTF-8 byte.
        let text = extract_text(b"caf\xe9", None, "note.txt");
        assert_eq!(text, "café");
    }

    #[test]
    fn lossy_decode_is_the_last_resort() {
        // Invalid UTF-8 with an embedded control byte: not Latin-1 material.
        let text = extract_text(b"ab\x00\xff", None, "note.txt");
        assert!(text.starts_with("ab"));
    }

    #[test]
    fn invalid_pdf_extracts_to_empty() {
        assert_eq!(extract_text(b"not a pdf", None, "broken.pdf"), "");
    }

    #[test]
    fn invalid_docx_extracts_to_empty() {
        assert_eq!(extract_text(b"not a zip", Some(MIME_DOCX), "broken.docx"), "");
    }

    #[test]
    fn image_extension_extracts_to_empty() {
        assert_eq!(extract_text(b"\x89PNG\r\n", None, "photo.png"), "");
    }

    #[test]
    fn extension_takes_precedence_over_media_type() {
        // Declared text/plain, but the .pdf extension routes to the PDF
        // decoder, which fails and downgrades to empty.
        assert_eq!(extract_text(b"plain text", Some("text/plain"), "doc.pdf"), "");
    }

    #[test]
    fn media_type_is_used_when_extension_is_unknown() {
        assert_eq!(extract_text(b"junk", Some("image/png"), "upload.bin"), "");
    }

    #[test]
    fn empty_payload_extracts_to_empty() {
        assert_eq!(extract_text(b"", None, "empty.txt"), "");
    }
}
