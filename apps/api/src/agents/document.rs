//! Document extraction collaborator: file path in, plain text out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Reads `.pdf` through `pdf-extract` and `.txt`/`.md` as UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextExtractor;

#[async_trait]
impl DocumentExtractor for FileTextExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => {
                let bytes = tokio::fs::read(path).await.map_err(|source| ExtractionError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                // PDF parsing is CPU-bound; keep it off the async workers.
                tokio::task::spawn_blocking(move || {
                    pdf_extract::extract_text_from_mem(&bytes)
                        .map_err(|e| ExtractionError::Pdf(e.to_string()))
                })
                .await?
            }
            "txt" | "md" => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ExtractionError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            "" => Err(ExtractionError::Unsupported(path.display().to_string())),
            other => Err(ExtractionError::Unsupported(format!(".{other}"))),
        }
    }
}
