// Extraction module
// Plain text out of the file formats documents and folder files arrive in

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

const DOCX_BODY: &str = "word/document.xml";

/// Input format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    /// `.docx`, and `.doc` files saved in the same format
    Word,
    Text,
    /// Anything else is read as text, dropping invalid UTF-8
    Other,
}

impl FileKind {
    #[inline]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("doc" | "docx") => Self::Word,
            Some("txt") => Self::Text,
            _ => Self::Other,
        }
    }
}

/// Read `path` and extract its text according to its extension
#[inline]
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let kind = FileKind::from_path(path);
    debug!("Extracting {:?} text from {}", kind, path.display());
    extract_bytes(kind, &bytes)
        .with_context(|| format!("Failed to extract text from {}", path.display()))
}

#[inline]
pub fn extract_bytes(kind: FileKind, bytes: &[u8]) -> Result<String> {
    match kind {
        FileKind::Pdf => pdf_text(bytes),
        FileKind::Word => word_text(bytes),
        FileKind::Text => String::from_utf8(bytes.to_vec()).context("File is not valid UTF-8"),
        FileKind::Other => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// One line group per page; pages without a text layer are skipped
fn pdf_text(bytes: &[u8]) -> Result<String> {
    let document = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
    let mut text = String::new();
    for number in document.get_pages().into_keys() {
        match document.extract_text(&[number]) {
            Ok(page) if !page.trim().is_empty() => {
                text.push_str(page.trim_end());
                text.push('\n');
            }
            Ok(_) => warn!("PDF page {} has no text layer, skipping it", number),
            Err(e) => warn!("Failed to extract text from PDF page {}: {}", number, e),
        }
    }
    Ok(text)
}

/// Paragraph text from the WordprocessingML body, one line per paragraph
fn word_text(bytes: &[u8]) -> Result<String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).context("File is not a Word document archive")?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .with_context(|| format!("Word document has no {DOCX_BODY}"))?
        .read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {DOCX_BODY}"))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event().context("Malformed Word document body")? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" | b"w:br" => text.push('\n'),
                b"w:tab" => text.push('\t'),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                text.push_str(&t.unescape().context("Invalid escape in Word document")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}
