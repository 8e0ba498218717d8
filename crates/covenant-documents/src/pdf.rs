//! PDF page text via `pdf-extract`

use crate::DocumentError;

const PAGE_BREAK: char = '\x0C';

/// One string per page
///
/// Pages are separated by the form feed the text backend emits between
/// pages. Output without any form feed is treated as a single page.
pub(crate) fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        let msg = e.to_string();
        if msg.to_lowercase().contains("encrypt") {
            DocumentError::Pdf(format!("document is encrypted: {}", msg))
        } else {
            DocumentError::Pdf(msg)
        }
    })?;
    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if !text.contains(PAGE_BREAK) {
        return vec![text.to_string()];
    }
    text.split(PAGE_BREAK).map(str::to_string).collect()
}
