//! Document extraction: turns uploaded resume bytes into plain text.
//!
//! Extraction failures are terminal for the request: the bytes are presumed
//! unrecoverable, so nothing here is retried.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document is empty")]
    Empty,

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("document contains no extractable text")]
    NoText,
}

/// The document-extraction collaborator.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// `filename` is a hint only; content sniffing wins when they disagree.
    async fn extract_text(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<String, ExtractionError>;
}

/// Default extractor: PDFs through `pdf-extract`, everything else as UTF-8.
pub struct FileExtractor;

#[async_trait]
impl DocumentExtractor for FileExtractor {
    async fn extract_text(
        &self,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }

        let text = if is_pdf(&bytes, filename) {
            debug!("Extracting text from {} byte PDF", bytes.len());
            // pdf-extract is CPU bound and can panic on hostile input.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| ExtractionError::Pdf(format!("parser aborted: {e}")))?
                .map_err(|e| ExtractionError::Pdf(format!("{e:?}")))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

fn is_pdf(bytes: &[u8], filename: Option<&str>) -> bool {
    bytes.starts_with(PDF_MAGIC)
        || filename
            .map(|f| f.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false)
}
