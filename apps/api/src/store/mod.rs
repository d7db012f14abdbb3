//! Persistence Gateway — candidate summaries and the job catalog.
//!
//! Handlers, the batch coordinator and the matcher only see `CandidateStore`;
//! `PgStore` is the production implementation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::candidate::{CandidateRow, CandidateSummary};
use crate::models::job::{JobRow, NewJob};

pub mod postgres;

pub use postgres::PgStore;

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Inserts a summary and returns its id.
    async fn add_candidate(&self, summary: &CandidateSummary) -> Result<i64>;

    /// All candidates, newest first.
    async fn get_all_candidates(&self) -> Result<Vec<CandidateRow>>;

    /// Whether a candidate with this filename is stored, compared after
    /// `normalize_filename`.
    async fn filename_exists(&self, filename: &str) -> Result<bool>;

    async fn add_job(&self, job: &NewJob) -> Result<i64>;

    /// All jobs, newest first.
    async fn get_all_jobs(&self) -> Result<Vec<JobRow>>;

    /// Jobs at `experience_level` whose requirements mention any of `skills`
    /// (case-insensitive). No skills → every job at that level.
    async fn search_jobs(&self, skills: &[String], experience_level: &str) -> Result<Vec<JobRow>>;
}

/// Identifier used for duplicate detection: trimmed, case-folded filename.
pub fn normalize_filename(filename: &str) -> String {
    filename.trim().to_lowercase()
}
