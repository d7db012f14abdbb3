//! Staging of multipart résumé uploads into a private temp directory.

use axum::extract::Multipart;
use tempfile::TempDir;
use tracing::debug;

use crate::errors::AppError;
use crate::pipeline::ResumeInput;

/// Uploaded files on disk plus the optional provider key sent with them.
/// The directory, and every file in it, is removed when this is dropped.
pub struct StagedUpload {
    _dir: TempDir,
    pub files: Vec<ResumeInput>,
    pub nebius_key: Option<String>,
}

/// Writes every part named `file_field` to `<tmp>/<n>/<filename>` so two
/// uploads with the same name never collide. Text field `nebius_key` is
/// captured; other fields are ignored.
pub async fn stage_multipart(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<StagedUpload, AppError> {
    let dir = TempDir::new()?;
    let mut files = Vec::new();
    let mut nebius_key = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "nebius_key" {
            nebius_key = Some(field.text().await?).filter(|k| !k.trim().is_empty());
            continue;
        }
        if name != file_field {
            continue;
        }

        let index = files.len();
        let filename = sanitize_filename(field.file_name().unwrap_or_default(), index);
        let bytes = field.bytes().await?;

        let slot = dir.path().join(index.to_string());
        tokio::fs::create_dir(&slot).await?;
        let path = slot.join(&filename);
        tokio::fs::write(&path, &bytes).await?;
        debug!("Staged upload {filename} ({} bytes)", bytes.len());

        files.push(ResumeInput::new(filename, path));
    }

    Ok(StagedUpload {
        _dir: dir,
        files,
        nebius_key,
    })
}

/// Final path component only, whichever separator the client used.
fn sanitize_filename(raw: &str, index: usize) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => format!("upload-{index}"),
        name => name.to_string(),
    }
}
