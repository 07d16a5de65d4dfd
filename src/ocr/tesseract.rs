//! Tesseract CLI OCR provider.

use super::OcrProvider;
use crate::config::OcrConfig;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

pub struct TesseractProvider {
    bin: String,
    language: String,
}

impl TesseractProvider {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            bin: config.tesseract_bin.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait::async_trait]
impl OcrProvider for TesseractProvider {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &Path) -> anyhow::Result<String> {
        let output = Command::new(&self.bin)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.bin, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} failed on {:?} ({}): {}",
                self.bin,
                image.file_name().unwrap_or_default(),
                output.status,
                stderr.trim()
            );
        }

        if !output.stderr.is_empty() {
            debug!(
                "Tesseract stderr on {:?}: {}",
                image.file_name().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("TesseractProvider: {} chars from {:?}", text.len(), image);
        Ok(text)
    }
}
