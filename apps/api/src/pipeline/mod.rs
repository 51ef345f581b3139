//! Cold email pipeline — orchestrates one run for one job page.
//!
//! Flow: fetch page → clean text → extract jobs → per job: match portfolio
//!       links → compose email.
//!
//! Runs strictly in sequence. Any failure aborts the whole run; there is no
//! partial result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::composer::write_mail;
use crate::errors::AppError;
use crate::extraction::{extract_jobs, JobRecord};
use crate::scraping::clean_text;
use crate::state::AppState;

pub mod handlers;

/// The email drafted for one extracted job.
#[derive(Debug, Clone, Serialize)]
pub struct ColdEmail {
    pub job: JobRecord,
    pub links: Vec<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub url: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ColdEmail>,
}

/// Runs the full pipeline against `url`.
pub async fn run_pipeline(state: &AppState, url: &str) -> Result<PipelineRun, AppError> {
    // Step 1: Fetch and clean the page
    let page = state.fetcher.fetch(url).await?;
    let cleaned = clean_text(&page.text);

    // Step 2: Extract job records
    let jobs = extract_jobs(&cleaned, &state.llm).await?;
    if jobs.is_empty() {
        warn!("No job postings extracted from {}", url);
    }

    // Step 3: Match and compose, one job at a time
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        if job.skills.is_empty() {
            warn!("No skills found for role {:?}", job.role);
        }

        let links = state
            .portfolio
            .query_links(&job.skills, state.config.portfolio.match_count)
            .await?;
        info!("Matched {} portfolio link(s) for role {:?}", links.len(), job.role);

        let email = write_mail(&job, &links, &state.config.sender, &state.llm).await?;
        results.push(ColdEmail { job, links, email });
    }

    Ok(PipelineRun {
        url: url.to_string(),
        generated_at: Utc::now(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use mockito::Matcher;
    use serde_json::json;

    const JOB_PAGE: &str = r#"<html><body>
        <h1>Careers</h1>
        <p>Backend Engineer: 3 years of Go and SQL. Build APIs.</p>
        <p>ML Engineer: Python and TensorFlow.</p>
    </body></html>"#;

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[tokio::test]
    async fn test_pipeline_composes_one_email_per_job() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/1")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(JOB_PAGE)
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("SCRAPED TEXT FROM WEBSITE".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(
                r#"```json
[{"role":"Backend Engineer","experience":"3 years","skills":["Go","SQL"],"description":"Build APIs"},
 {"role":"ML Engineer","experience":"","skills":["Machine Learning","TensorFlow"],"description":"Train models"}]
```"#,
            ))
            .expect(1)
            .create_async()
            .await;
        let compose = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("COLD EMAIL".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion("Dear hiring team, ..."))
            .expect(2)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&server.url(), dir.path()).await;

        let run = run_pipeline(&state, &format!("{}/jobs/1", server.url()))
            .await
            .unwrap();

        assert_eq!(run.results.len(), 2);
        assert_eq!(run.results[0].job.role, "Backend Engineer");
        assert_eq!(run.results[0].email, "Dear hiring team, ...");
        assert_eq!(
            run.results[1].links.first().map(String::as_str),
            Some("https://example.com/ml-python-portfolio")
        );
        assert!(run.results.iter().all(|r| r.links.len() <= 2));
        compose.assert_async().await;
    }

    #[tokio::test]
    async fn test_pipeline_aborts_on_fetch_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone")
            .with_status(410)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&server.url(), dir.path()).await;

        let err = run_pipeline(&state, &format!("{}/gone", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_pipeline_aborts_on_malformed_extraction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/jobs/2")
            .with_status(200)
            .with_body(JOB_PAGE)
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(r#"Jobs: [{"role": "X" "skills": []}]"#))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&server.url(), dir.path()).await;

        let err = run_pipeline(&state, &format!("{}/jobs/2", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MALFORMED_JSON");
    }
}
