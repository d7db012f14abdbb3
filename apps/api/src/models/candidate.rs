use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Persisted projection of a finished pipeline run. Written once per
/// processed résumé and never modified by the service afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub filename: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub score: f64,
    pub recommendation: String,
    pub full_report: Value,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: i64,
    pub filename: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub score: f64,
    pub recommendation: Option<String>,
    pub full_report: Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
