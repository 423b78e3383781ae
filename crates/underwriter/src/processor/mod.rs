pub mod pdf;

pub use pdf::ExtractedPage;

use crate::error::ProcessError;

/// Runs PDF text extraction on the blocking pool.
pub async fn extract_pdf_pages(pdf_bytes: Vec<u8>) -> Result<Vec<ExtractedPage>, ProcessError> {
    tokio::task::spawn_blocking(move || pdf::extract_pages(&pdf_bytes))
        .await
        .map_err(|e| ProcessError::TaskFailed(e.to_string()))?
}
