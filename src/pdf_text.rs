//! Embedded-text extraction for PDFs.

use anyhow::Result;
use std::path::Path;

/// Pulls the text layer out of a PDF. An empty string means the document has
/// no usable text layer.
#[async_trait::async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, pdf: &Path) -> Result<String>;
}

/// [`TextExtractor`] backed by lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

#[async_trait::async_trait]
impl TextExtractor for LopdfExtractor {
    async fn extract(&self, pdf: &Path) -> Result<String> {
        let data = tokio::fs::read(pdf).await?;
        tokio::task::spawn_blocking(move || extract_pdf_text(&data)).await?
    }
}

/// Extract text from PDF bytes, page by page in page order.
pub fn extract_pdf_text(data: &[u8]) -> Result<String> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;

    let mut text = String::new();
    let pages = doc.get_pages();

    for (page_num, _) in pages {
        match doc.extract_text(&[page_num]) {
            Ok(content) => {
                text.push_str(&content);
                text.push('\n');
            }
            Err(e) => tracing::debug!("No text on page {}: {}", page_num, e),
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        assert!(extract_pdf_text(b"\x89PNG\r\n\x1a\nnot a pdf").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = LopdfExtractor
            .extract(Path::new("/nonexistent/upload.pdf"))
            .await;
        assert!(result.is_err());
    }
}
