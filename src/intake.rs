//! File intake pipeline.
//!
//! Takes a batch of staged uploads and, strictly in submission order,
//! classifies each file, extracts its text, persists one record and removes
//! the staged artifacts. The first unrecovered error aborts the whole batch;
//! records written before it stay written.

use crate::error::IntakeError;
use crate::ocr::OcrProvider;
use crate::pdf_text::TextExtractor;
use crate::raster::Rasterizer;
use crate::staging::UploadedFile;
use crate::store::{ExtractionRecord, RecordStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

pub const PDF_MIME: &str = "application/pdf";

/// How many leading bytes are inspected when sniffing the file type.
const SNIFF_LEN: usize = 1024;

/// Extraction strategy for an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Image,
}

impl MediaKind {
    /// Decide from the file's leading bytes when they are recognizable, and
    /// from the client-asserted MIME type otherwise.
    ///
    /// Image signatures sit at offset 0 and win over a `%PDF-` marker, which
    /// may appear anywhere in the sniffed prefix (image metadata included).
    pub fn detect(mime_type: &str, head: &[u8]) -> Self {
        if has_image_magic(head) {
            return MediaKind::Image;
        }
        if contains_pdf_header(head) {
            return MediaKind::Pdf;
        }

        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(PDF_MIME) {
            MediaKind::Pdf
        } else {
            MediaKind::Image
        }
    }
}

fn contains_pdf_header(head: &[u8]) -> bool {
    head.windows(5).any(|w| w == b"%PDF-")
}

fn has_image_magic(head: &[u8]) -> bool {
    const MAGICS: &[&[u8]] = &[
        b"\x89PNG\r\n\x1a\n",
        b"\xff\xd8\xff",
        b"GIF87a",
        b"GIF89a",
        b"II*\x00",
        b"MM\x00*",
        b"BM",
    ];
    if MAGICS.iter().any(|m| head.starts_with(m)) {
        return true;
    }
    head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP"
}

/// Per-file entry of an upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub filename: String,
    pub extracted_text: String,
}

/// Pipeline orchestrator.
#[derive(Clone)]
pub struct IntakePipeline {
    text: Arc<dyn TextExtractor>,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrProvider>,
    store: Arc<dyn RecordStore>,
}

impl IntakePipeline {
    pub fn new(
        text: Arc<dyn TextExtractor>,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrProvider>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            text,
            rasterizer,
            ocr,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Process every file of one upload, in order.
    pub async fn process_batch(&self, files: &[UploadedFile]) -> Result<Vec<FileResult>, IntakeError> {
        if files.is_empty() {
            return Err(IntakeError::NoFiles);
        }

        info!(
            "Processing batch of {} files (ocr={}, store={})",
            files.len(),
            self.ocr.name(),
            self.store.name()
        );

        let mut results = Vec::with_capacity(files.len());
        for (idx, file) in files.iter().enumerate() {
            match self.process_file(file).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        "Aborting batch at file {} of {} ({}): {}",
                        idx + 1,
                        files.len(),
                        file.original_name,
                        err
                    );
                    for pending in &files[idx..] {
                        remove_best_effort(&pending.storage_path).await;
                    }
                    return Err(err);
                }
            }
        }

        Ok(results)
    }

    async fn process_file(&self, file: &UploadedFile) -> Result<FileResult, IntakeError> {
        let kind = classify(file).await?;
        debug!("{} classified as {:?} (asserted {})", file.original_name, kind, file.mime_type);

        let text = match kind {
            MediaKind::Pdf => self.extract_pdf(file).await?,
            MediaKind::Image => self.ocr_file(file).await?,
        };

        let record = ExtractionRecord {
            filename: file.original_name.clone(),
            text,
        };
        let id = self
            .store
            .insert_one(&record)
            .await
            .map_err(|source| IntakeError::Persistence {
                filename: file.original_name.clone(),
                source,
            })?;

        info!(
            "Stored {} as {} ({} chars)",
            file.original_name,
            id,
            record.text.len()
        );

        remove_best_effort(&file.storage_path).await;

        Ok(FileResult {
            filename: record.filename,
            extracted_text: record.text,
        })
    }

    /// Use the embedded text layer, falling back to page-by-page OCR when it
    /// is missing or unreadable.
    async fn extract_pdf(&self, file: &UploadedFile) -> Result<String, IntakeError> {
        let direct = match self.text.extract(&file.storage_path).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Error extracting text from PDF {}: {:#}", file.original_name, e);
                String::new()
            }
        };

        if !direct.is_empty() {
            debug!("{}: using embedded text", file.original_name);
            return Ok(direct);
        }

        info!("{}: no embedded text, falling back to OCR", file.original_name);
        self.ocr_scanned_pdf(file).await
    }

    async fn ocr_scanned_pdf(&self, file: &UploadedFile) -> Result<String, IntakeError> {
        let parent = file.storage_path.parent().unwrap_or_else(|| Path::new("."));
        // Whatever is left in here when it drops (pages after a failed one) is removed with it.
        let render_dir = match tempfile::Builder::new().prefix("pages-").tempdir_in(parent) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Could not create render dir for {}: {}", file.original_name, e);
                return Ok(String::new());
            }
        };

        let pages = match self
            .rasterizer
            .rasterize(&file.storage_path, render_dir.path())
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Error converting PDF {} to images: {:#}", file.original_name, e);
                Vec::new()
            }
        };

        let mut text = String::new();
        for page in &pages {
            let recognized = self.ocr.recognize(&page.path).await;
            remove_best_effort(&page.path).await;

            let page_text = recognized.map_err(|source| IntakeError::Ocr {
                filename: file.original_name.clone(),
                source: source.context(format!("page {}", page.page_num)),
            })?;
            text.push_str(page_text.trim());
            text.push('\n');
        }

        debug!(
            "{}: OCR'd {} pages ({} chars)",
            file.original_name,
            pages.len(),
            text.len()
        );
        Ok(text)
    }

    async fn ocr_file(&self, file: &UploadedFile) -> Result<String, IntakeError> {
        self.ocr
            .recognize(&file.storage_path)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|source| IntakeError::Ocr {
                filename: file.original_name.clone(),
                source,
            })
    }
}

async fn classify(file: &UploadedFile) -> Result<MediaKind, IntakeError> {
    let head = read_head(&file.storage_path)
        .await
        .map_err(|source| IntakeError::Staging {
            filename: file.original_name.clone(),
            source,
        })?;
    Ok(MediaKind::detect(&file.mime_type, &head))
}

async fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
    Ok(head)
}

async fn remove_best_effort(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove {:?}: {}", path, e);
    }
}
