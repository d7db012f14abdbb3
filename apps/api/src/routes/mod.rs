pub mod candidate;
pub mod health;
pub mod jobs;
pub mod recruiter;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Résumé uploads can be several PDFs at once.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidate portal
        .route("/api/candidate/analyze", post(candidate::analyze_resume))
        // Recruiter dashboard
        .route("/api/recruiter/candidates", get(recruiter::list_candidates))
        .route("/api/recruiter/sync_resumes", post(recruiter::sync_resumes))
        .route("/api/recruiter/upload", post(recruiter::upload_resumes))
        // Job catalog
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::add_job))
        .route("/api/jobs/search", get(jobs::search_jobs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::LlmProvider;
    use crate::testing::{test_config, MemoryStore, ScriptedFactory, ScriptedGenerator, StubDocuments};

    const BOUNDARY: &str = "recruiter-test-boundary";

    struct Harness {
        router: Router,
        store: Arc<MemoryStore>,
        llm: Arc<ScriptedFactory>,
    }

    fn harness(reply: &str, documents: StubDocuments) -> Harness {
        let store = Arc::new(MemoryStore::with_sample_jobs());
        let llm = Arc::new(ScriptedFactory::new(ScriptedGenerator::always(reply)));
        let state = AppState {
            store: store.clone(),
            documents: Arc::new(documents),
            llm: llm.clone(),
            config: test_config(),
        };
        Harness {
            router: build_router(state),
            store,
            llm,
        }
    }

    /// `(field name, optional filename, content)` parts.
    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/pdf\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn multipart_request(uri: &str, body: Body) -> Request<Body> {
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness("{}", StubDocuments::text("cv"));
        let (status, body) = send(
            h.router,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["service"], json!("recruiter-api"));
    }

    #[tokio::test]
    async fn test_analyze_with_unparseable_backend_still_reports() {
        let h = harness("not json", StubDocuments::text("Jane Doe\nRust"));
        let (status, body) = send(
            h.router,
            multipart_request(
                "/api/candidate/analyze",
                multipart(&[("file", Some("Jane_Doe.pdf"), "%PDF")]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["provider_used"], json!("ollama"));
        assert_eq!(body["report"]["status"], json!("completed_degraded"));
        assert_eq!(body["jobs"], json!([]));
        assert_eq!(body["advice"]["career_advice"], json!("Keep applying!"));
        assert!(h.store.candidate_filenames().is_empty(), "analyze must not persist");
    }

    #[tokio::test]
    async fn test_analyze_nebius_key_switches_provider() {
        let h = harness("{}", StubDocuments::text("Jane Doe"));
        let (status, body) = send(
            h.router,
            multipart_request(
                "/api/candidate/analyze",
                multipart(&[
                    ("nebius_key", None, "secret"),
                    ("file", Some("cv.pdf"), "%PDF"),
                ]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider_used"], json!("nebius"));
        assert_eq!(h.llm.last_provider(), Some(LlmProvider::Nebius));
    }

    #[tokio::test]
    async fn test_analyze_unreadable_document_is_422() {
        let h = harness("{}", StubDocuments::failing("corrupt"));
        let (status, body) = send(
            h.router,
            multipart_request(
                "/api/candidate/analyze",
                multipart(&[("file", Some("cv.pdf"), "junk")]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], json!("UNPROCESSABLE_ENTITY"));
        assert_eq!(h.llm.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_without_file_is_400() {
        let h = harness("{}", StubDocuments::text("cv"));
        let (status, _) = send(
            h.router,
            multipart_request("/api/candidate/analyze", multipart(&[("other", None, "x")])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_persists_and_skips_duplicates() {
        let h = harness("{}", StubDocuments::text("Jane Doe"));
        let (status, body) = send(
            h.router.clone(),
            multipart_request(
                "/api/recruiter/upload",
                multipart(&[
                    ("files", Some("a.pdf"), "%PDF"),
                    ("files", Some("A.pdf"), "%PDF"),
                    ("files", Some("b.pdf"), "%PDF"),
                ]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let statuses: Vec<_> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["status"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(statuses, vec!["Analyzed", "Skipped-Duplicate", "Analyzed"]);
        assert_eq!(h.store.candidate_filenames(), vec!["a.pdf", "b.pdf"]);

        let (_, listed) = send(
            h.router,
            Request::get("/api/recruiter/candidates")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(listed["results"].as_array().unwrap().len(), 2);
        assert_eq!(listed["results"][0]["filename"], json!("b.pdf"));
    }

    #[tokio::test]
    async fn test_add_job_validation_and_search() {
        let h = harness("{}", StubDocuments::text("cv"));
        let job = json!({
            "title": "Platform Engineer",
            "company": "Acme",
            "location": "Remote",
            "type": "Full-time",
            "experience_level": "Senior",
            "description": "Run the platform",
            "requirements": ["Kubernetes", "Rust"]
        });

        let (status, body) = send(
            h.router.clone(),
            Request::post("/api/jobs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(job.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(5));

        let mut invalid = job.clone();
        invalid["title"] = json!(" ");
        let (status, body) = send(
            h.router.clone(),
            Request::post("/api/jobs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(invalid.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));

        let (status, body) = send(
            h.router,
            Request::get("/api/jobs/search?skills=rust,go&experience_level=Senior")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|j| j["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["Platform Engineer"]);
        assert_eq!(body[0]["type"], json!("Full-time"));
    }
}
