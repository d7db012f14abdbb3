use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use crate::models::candidate::{CandidateRow, CandidateSummary};
use crate::models::job::{JobRow, NewJob};
use crate::store::{normalize_filename, CandidateStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn add_candidate(&self, summary: &CandidateSummary) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO candidates
                (filename, name, email, phone, score, recommendation, full_report, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&summary.filename)
        .bind(&summary.name)
        .bind(&summary.email)
        .bind(&summary.phone)
        .bind(summary.score)
        .bind(&summary.recommendation)
        .bind(&summary.full_report)
        .bind(&summary.status)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to insert candidate '{}'", summary.filename))?;

        info!("Stored candidate {id} ({})", summary.filename);
        Ok(id)
    }

    async fn get_all_candidates(&self) -> Result<Vec<CandidateRow>> {
        Ok(sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn filename_exists(&self, filename: &str) -> Result<bool> {
        // Matches the expression index on LOWER(TRIM(filename)).
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM candidates WHERE LOWER(TRIM(filename)) = $1)",
        )
        .bind(normalize_filename(filename))
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to look up candidate '{filename}'"))?)
    }

    async fn add_job(&self, job: &NewJob) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO jobs
                (title, company, location, type, experience_level,
                 salary_range, description, requirements, benefits)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.job_type)
        .bind(&job.experience_level)
        .bind(&job.salary_range)
        .bind(&job.description)
        .bind(Json(&job.requirements))
        .bind(Json(&job.benefits))
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to insert job '{}'", job.title))?;

        info!("Stored job {id} ({})", job.title);
        Ok(id)
    }

    async fn get_all_jobs(&self) -> Result<Vec<JobRow>> {
        Ok(
            sqlx::query_as::<_, JobRow>("SELECT * FROM jobs ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn search_jobs(&self, skills: &[String], experience_level: &str) -> Result<Vec<JobRow>> {
        let patterns: Vec<String> = skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
            .collect();

        Ok(sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE experience_level = $1
              AND (cardinality($2::text[]) = 0
                   OR requirements::text ILIKE ANY($2::text[]))
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(experience_level)
        .bind(&patterns)
        .fetch_all(&self.pool)
        .await?)
    }
}

/// Escapes LIKE wildcards so a skill such as `C#_` matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
