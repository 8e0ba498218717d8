//! DOCX paragraphs grouped into pseudo-pages

use crate::DocumentError;

/// Character threshold for one DOCX pseudo-page
pub const DOCX_PAGE_CHARS: usize = 3000;

pub(crate) fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DocumentError::Docx(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            let mut buf = String::new();
            for run_child in &para.children {
                if let docx_rs::ParagraphChild::Run(run) = run_child {
                    for r in &run.children {
                        if let docx_rs::RunChild::Text(t) = r {
                            buf.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(buf);
        }
    }

    Ok(paginate_paragraphs(&paragraphs))
}

/// Group paragraphs into pages of about [`DOCX_PAGE_CHARS`] characters
///
/// Paragraphs are trimmed and blank ones dropped; each kept paragraph is
/// followed by a newline. A paragraph that would push the running count past
/// the threshold opens a new page.
pub fn paginate_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut char_count = 0usize;

    for paragraph in paragraphs {
        let text = paragraph.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        let len = text.chars().count();

        if char_count + len > DOCX_PAGE_CHARS && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            char_count = 0;
        }
        current.push_str(text);
        current.push('\n');
        char_count += len;
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}
