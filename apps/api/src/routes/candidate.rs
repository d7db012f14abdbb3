use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::AppError;
use crate::routes::upload::stage_multipart;
use crate::state::AppState;

/// POST /api/candidate/analyze
/// Runs one résumé through the pipeline and the career advisor. Nothing is
/// persisted.
pub async fn analyze_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let upload = stage_multipart(multipart, "file").await?;
    let input = upload
        .files
        .first()
        .cloned()
        .ok_or_else(|| AppError::Validation("Missing 'file' upload".to_string()))?;

    let session = state.session(upload.nebius_key.as_deref());
    info!(
        "Analyzing {} with {} ({})",
        input.filename,
        session.llm_config.provider.as_str(),
        session.llm_config.model
    );

    let report = session.orchestrator.run(&input).await?;
    if report.extraction_failed() {
        return Err(AppError::UnprocessableEntity(
            "Failed to extract text from the resume".to_string(),
        ));
    }

    let advice = session.advisor().advise(&report.analysis_results).await;
    let jobs = report
        .job_matches
        .get("matched_jobs")
        .cloned()
        .unwrap_or_else(|| json!([]));

    Ok(Json(json!({
        "status": "success",
        "provider_used": session.llm_config.provider,
        "profile": report.analysis_results.clone(),
        "jobs": jobs,
        "advice": advice,
        "report": report,
    })))
}
