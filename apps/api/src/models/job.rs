use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub job_type: String,
    pub experience_level: String,
    pub salary_range: Option<String>,
    pub description: String,
    pub requirements: Json<Vec<String>>,
    pub benefits: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for a new job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub experience_level: String,
    #[serde(default)]
    pub salary_range: Option<String>,
    pub description: String,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl NewJob {
    /// Returns the first missing required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("company", &self.company),
            ("location", &self.location),
            ("type", &self.job_type),
            ("experience_level", &self.experience_level),
            ("description", &self.description),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}
