use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::job::{JobRow, NewJob};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobSearchQuery {
    /// Comma-separated.
    #[serde(default)]
    pub skills: String,
    pub experience_level: String,
}

impl JobSearchQuery {
    fn skill_list(&self) -> Vec<String> {
        self.skills
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(state.store.get_all_jobs().await?))
}

/// POST /api/jobs
pub async fn add_job(
    State(state): State<AppState>,
    Json(job): Json<NewJob>,
) -> Result<Json<Value>, AppError> {
    if let Some(field) = job.missing_field() {
        return Err(AppError::Validation(format!("'{field}' is required")));
    }
    let id = state.store.add_job(&job).await?;
    Ok(Json(json!({"status": "success", "id": id})))
}

/// GET /api/jobs/search?skills=a,b&experience_level=X
pub async fn search_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobSearchQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let jobs = state
        .store
        .search_jobs(&query.skill_list(), &query.experience_level)
        .await?;
    Ok(Json(jobs))
}
