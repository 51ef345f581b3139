//! Axum route handlers for the cold email front-end.

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::delivery::parse_mailbox;
use crate::errors::AppError;
use crate::pipeline::{run_pipeline, PipelineRun};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Job page to process; the configured default when absent.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub sent: bool,
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cold-emails
///
/// Runs the full pipeline: fetch → extract → match → compose.
/// Returns one drafted email per job found on the page.
pub async fn handle_generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PipelineRun>, AppError> {
    let request = parse_generate_request(&body)?;
    let url = request
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| state.config.default_job_url.clone());

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Validation(format!(
            "url must start with http:// or https://, got '{url}'"
        )));
    }

    info!("Generating cold emails for {}", url);
    let run = run_pipeline(&state, &url).await?;

    Ok(Json(run))
}

/// An empty body means "use the defaults"; anything else must be a JSON object.
fn parse_generate_request(body: &[u8]) -> Result<GenerateRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// POST /api/v1/cold-emails/send
///
/// Sends one composed email. Delivery failures, including missing SMTP
/// credentials, come back as `sent: false` with a readable message.
pub async fn handle_send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, AppError> {
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("body cannot be empty".to_string()));
    }
    parse_mailbox(&request.to)
        .map_err(|_| AppError::Validation(format!("Invalid email address: {}", request.to)))?;

    let to = request.to.trim();
    let response = match state.mailer.send(to, &request.body).await {
        Ok(()) => SendResponse {
            sent: true,
            message: format!("Email sent successfully to {to}!"),
        },
        Err(e) => {
            warn!("Email delivery to {} failed: {}", to, e);
            SendResponse {
                sent: false,
                message: format!("Failed to send email: {e}"),
            }
        }
    };

    Ok(Json(response))
}
