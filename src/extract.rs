//! Text extraction for uploaded documents.
//!
//! A [`Document`] is transient: its bytes are consumed by [`extract_text`] and dropped once the
//! ingestion pipeline has the text. Extraction either fully succeeds or fails; there is no
//! best-effort fallback for damaged files.

use lopdf::Document as PdfDocument;
use std::path::Path;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors raised while turning a document into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// PDF structure could not be parsed or a page could not be decoded.
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    /// Plain-text upload was not valid UTF-8.
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// UTF-8 encoded plain text.
    PlainText,
}

impl DocumentKind {
    /// Infer the kind from an uploaded file name; anything other than `.pdf` is plain text.
    pub fn from_file_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf { Self::Pdf } else { Self::PlainText }
    }
}

/// Raw uploaded bytes plus their declared kind.
#[derive(Debug, Clone)]
pub struct Document {
    /// Original file name, used for logging.
    pub name: String,
    /// Declared format.
    pub kind: DocumentKind,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Build a document, inferring its kind from `name`.
    pub fn from_upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = DocumentKind::from_file_name(&name);
        Self { name, kind, bytes }
    }

    /// Build a plain-text document from an in-memory string.
    pub fn plain_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DocumentKind::PlainText,
            bytes: text.into().into_bytes(),
        }
    }
}

/// Extract the full text of a document, consuming it.
///
/// PDF pages are concatenated in page order, each followed by a newline; a page with no text
/// contributes an empty segment.
pub fn extract_text(document: Document) -> Result<String, ExtractionError> {
    match document.kind {
        DocumentKind::Pdf => extract_pdf(&document.bytes),
        DocumentKind::PlainText => Ok(String::from_utf8(document.bytes)?),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pdf = PdfDocument::load_mem(bytes).map_err(|err| ExtractionError::Pdf(err.to_string()))?;
    let pages = pdf.get_pages();
    tracing::debug!(pages = pages.len(), "Extracting PDF text");

    let mut text = String::new();
    // `get_pages` is a BTreeMap keyed by page number, so iteration is already in page order.
    for page_number in pages.keys() {
        let page_text = pdf
            .extract_text(&[*page_number])
            .map_err(|err| ExtractionError::Pdf(format!("page {page_number}: {err}")))?;
        push_page(&mut text, &page_text);
    }
    Ok(text)
}

/// Append one page's text, ending it with a newline unless it already ends with one.
fn push_page(text: &mut String, page_text: &str) {
    text.push_str(page_text);
    if !text.ends_with('\n') {
        text.push('\n');
    }
}
