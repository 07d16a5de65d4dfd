//! Scratch storage for uploaded files.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file received in an upload batch and written to scratch storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied filename, kept verbatim.
    pub original_name: String,
    pub storage_path: PathBuf,
    /// Client-asserted content type.
    pub mime_type: String,
}

/// The shared scratch directory uploads and page renders are written to.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if it does not exist yet.
    pub async fn ensure_exists(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Write one uploaded part to disk.
    ///
    /// Every part gets its own scratch name, so identical client filenames in
    /// the same or concurrent batches never overwrite each other.
    pub async fn stage(
        &self,
        original_name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> std::io::Result<UploadedFile> {
        let storage_path = self
            .root
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name)));
        tokio::fs::write(&storage_path, data).await?;

        tracing::debug!(
            "Staged {} ({} bytes, {}) at {:?}",
            original_name,
            data.len(),
            mime_type,
            storage_path
        );

        Ok(UploadedFile {
            original_name: original_name.to_string(),
            storage_path,
            mime_type: mime_type.to_string(),
        })
    }
}

/// Reduce a client filename to a safe single path component.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_start_matches('.') {
        "" => "upload".to_string(),
        rest => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scan.png"), "scan.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my file.pdf"), "my_file.pdf");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn test_duplicate_names_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let first = staging.stage("same.png", "image/png", b"one").await.unwrap();
        let second = staging.stage("same.png", "image/png", b"two").await.unwrap();

        assert_eq!(first.original_name, "same.png");
        assert_eq!(second.original_name, "same.png");
        assert_ne!(first.storage_path, second.storage_path);
        assert_eq!(std::fs::read(&first.storage_path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.storage_path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("a/b/uploads"));
        staging.ensure_exists().await.unwrap();
        assert!(staging.root().is_dir());
    }
}
