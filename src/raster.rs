//! PDF page rasterization.

use crate::config::RasterConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// One rendered page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub page_num: u32,
    pub path: PathBuf,
}

/// Renders every page of a PDF to an image file inside `out_dir`.
#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PageImage>>;
}

/// [`Rasterizer`] that shells out to poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    bin: String,
    dpi: u32,
    scale_to: Option<u32>,
}

impl PdftoppmRasterizer {
    pub fn new(config: &RasterConfig) -> Self {
        Self {
            bin: config.pdftoppm_bin.clone(),
            dpi: config.dpi,
            scale_to: config.scale_to,
        }
    }
}

#[async_trait::async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PageImage>> {
        let prefix = out_dir.join("page");

        let mut cmd = Command::new(&self.bin);
        cmd.arg("-png").arg("-r").arg(self.dpi.to_string());
        if let Some(px) = self.scale_to {
            cmd.arg("-scale-to").arg(px.to_string());
        }
        cmd.arg(pdf).arg(&prefix);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed ({}): {}", self.bin, output.status, stderr.trim());
        }

        let pages = collect_pages(out_dir).await?;
        info!("Rendered {} pages from {:?}", pages.len(), pdf.file_name().unwrap_or_default());
        Ok(pages)
    }
}

/// Gather `page-N.png` files from `dir`, sorted by page number.
///
/// pdftoppm zero-pads page numbers to the width of the page count, so the
/// number is parsed rather than relying on lexical order.
async fn collect_pages(dir: &Path) -> Result<Vec<PageImage>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(page_num) = page_number(&path) {
            pages.push(PageImage { page_num, path });
        } else {
            debug!("Ignoring unexpected file in render dir: {:?}", path);
        }
    }

    pages.sort_by_key(|p| p.page_num);
    Ok(pages)
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, num) = stem.rsplit_once('-')?;
    num.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-010.png")), Some(10));
        assert_eq!(page_number(Path::new("/tmp/x/page-2.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[tokio::test]
    async fn test_collect_pages_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "stray.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_pages(dir.path()).await.unwrap();
        let nums: Vec<u32> = pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 2, 10]);
        assert_eq!(pages[0].path, dir.path().join("page-1.png"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PdftoppmRasterizer::new(&RasterConfig {
            pdftoppm_bin: "definitely-not-a-real-pdftoppm".to_string(),
            dpi: 300,
            scale_to: None,
        });
        let result = rasterizer
            .rasterize(Path::new("/nonexistent/in.pdf"), dir.path())
            .await;
        assert!(result.is_err());
    }
}
