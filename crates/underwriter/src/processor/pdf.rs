use log::warn;

use crate::error::ProcessError;

/// Marker lopdf leaves in place of glyphs from unsupported CID fonts.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Text of one page, 1-indexed in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub page: u32,
    pub text: String,
}

/// Extracts per-page text from an in-memory PDF.
///
/// A document that cannot be parsed, or that has no pages, is corrupt. A
/// single page whose text cannot be extracted yields an empty string so
/// the rest of the document is still analysed.
pub fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<ExtractedPage>, ProcessError> {
    let _span = tracing::info_span!("processor.pdf", bytes = pdf_bytes.len()).entered();

    let doc = lopdf::Document::load_mem(pdf_bytes)
        .map_err(|e| ProcessError::CorruptDocument(format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ProcessError::CorruptDocument(
            "PDF contains no pages".to_string(),
        ));
    }

    let extracted = pages
        .keys()
        .enumerate()
        .map(|(index, &page_num)| {
            let text = match doc.extract_text(&[page_num]) {
                Ok(raw) => clean_page_text(&raw),
                Err(e) => {
                    warn!("Failed to extract text from page {}: {}", page_num, e);
                    String::new()
                }
            };
            ExtractedPage {
                page: index as u32 + 1,
                text,
            }
        })
        .collect();

    Ok(extracted)
}

/// Drops unsupported-font markers and trailing whitespace.
fn clean_page_text(raw: &str) -> String {
    raw.replace(IDENTITY_H_PATTERN, "").trim_end().to_string()
}
