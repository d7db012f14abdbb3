use std::path::Path;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::pipeline::{BatchItemResult, ResumeInput};
use crate::routes::upload::stage_multipart;
use crate::state::AppState;

const NEBIUS_KEY_HEADER: &str = "x-nebius-key";

#[derive(Serialize)]
pub struct ResultsResponse<T> {
    pub status: &'static str,
    pub results: Vec<T>,
}

impl<T> ResultsResponse<T> {
    fn success(results: Vec<T>) -> Json<Self> {
        Json(Self {
            status: "success",
            results,
        })
    }
}

/// GET /api/recruiter/candidates
pub async fn list_candidates(
    State(state): State<AppState>,
) -> Result<Json<ResultsResponse<CandidateRow>>, AppError> {
    let candidates = state.store.get_all_candidates().await?;
    Ok(ResultsResponse::success(candidates))
}

/// POST /api/recruiter/sync_resumes
/// Processes every PDF in the configured résumé folder; already-stored files
/// come back as `Skipped-Duplicate`.
pub async fn sync_resumes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResultsResponse<BatchItemResult>>, AppError> {
    let inputs = scan_pdf_folder(Path::new(&state.config.resume_dir)).await?;
    if inputs.is_empty() {
        info!("No PDF files found in {}", state.config.resume_dir);
        return Ok(ResultsResponse::success(Vec::new()));
    }

    let nebius_key = headers
        .get(NEBIUS_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    let session = state.session(nebius_key);
    info!(
        "Syncing {} resumes with {}",
        inputs.len(),
        session.llm_config.provider.as_str()
    );

    let results = state.batch(&session).process_batch(&inputs).await;
    Ok(ResultsResponse::success(results))
}

/// POST /api/recruiter/upload
pub async fn upload_resumes(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResultsResponse<BatchItemResult>>, AppError> {
    // Held until the batch is done; dropping it removes the files.
    let upload = stage_multipart(multipart, "files").await?;
    if upload.files.is_empty() {
        return Err(AppError::Validation("No files uploaded".to_string()));
    }

    let session = state.session(upload.nebius_key.as_deref());
    let results = state.batch(&session).process_batch(&upload.files).await;
    Ok(ResultsResponse::success(results))
}

/// `*.pdf` files directly under `dir`, sorted by name. Creates `dir` if missing.
async fn scan_pdf_folder(dir: &Path) -> Result<Vec<ResumeInput>, AppError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut inputs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf || !entry.file_type().await?.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        inputs.push(ResumeInput::new(filename, path));
    }
    inputs.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(inputs)
}
