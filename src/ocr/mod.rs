//! OCR provider abstraction.
//!
//! Defines the [`OcrProvider`] trait so the intake pipeline can run against
//! the Tesseract CLI in production and fakes in tests.

pub mod tesseract;

use std::path::Path;

pub use tesseract::TesseractProvider;

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Recognize the text in the image stored at `image`. The result is
    /// returned untrimmed.
    async fn recognize(&self, image: &Path) -> anyhow::Result<String>;
}
