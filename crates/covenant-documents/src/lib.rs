//! Covenant Documents
//!
//! Turns uploaded document bytes into an ordered list of page texts, the
//! input the chunker expects.
//!
//! - PDF: one entry per physical page
//! - DOCX: paragraphs grouped into pseudo-pages of roughly 3000 characters
//!
//! ```no_run
//! use covenant_documents::extract_pages;
//!
//! let bytes = std::fs::read("contract.pdf").unwrap();
//! let pages = extract_pages(&bytes, "application/pdf");
//! println!("{} pages", pages.len());
//! ```

#![warn(missing_docs)]

mod docx;
mod pdf;

pub use docx::{paginate_paragraphs, DOCX_PAGE_CHARS};

use thiserror::Error;
use tracing::{error, info};

/// Errors from document readers
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Content type has no reader
    #[error("Unsupported document type: {0}")]
    Unsupported(String),

    /// PDF could not be read
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// DOCX could not be read
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Document formats with a page reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word processing document
    Docx,
}

impl DocumentKind {
    /// Content types accepted for each kind
    pub const SUPPORTED_CONTENT_TYPES: [&'static str; 3] = [
        "application/pdf",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/docx",
    ];

    /// Map a MIME type to a document kind; parameters such as `; charset=`
    /// are ignored
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }
}

/// Extract page texts, reporting reader failures as errors
///
/// An empty vector means the document was read but holds no text.
pub fn try_extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, DocumentError> {
    let kind = DocumentKind::from_content_type(content_type)
        .ok_or_else(|| DocumentError::Unsupported(content_type.to_string()))?;

    let pages = match kind {
        DocumentKind::Pdf => pdf::extract_pages(bytes)?,
        DocumentKind::Docx => docx::extract_pages(bytes)?,
    };

    info!(kind = ?kind, bytes = bytes.len(), pages = pages.len(), "Document read");
    Ok(pages)
}

/// Extract page texts; failures are logged and yield no pages
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Vec<String> {
    try_extract_pages(bytes, content_type).unwrap_or_else(|e| {
        error!(content_type, error = %e, "Error extracting text from document");
        Vec::new()
    })
}
