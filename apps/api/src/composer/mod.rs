//! Email Composer — drafts a cold email for one job from its matched links.

use tracing::info;

use crate::composer::prompts::{COLD_EMAIL_PROMPT_TEMPLATE, NO_LINKS_PLACEHOLDER};
use crate::config::SenderPersona;
use crate::errors::AppError;
use crate::extraction::JobRecord;
use crate::llm_client::prompts::NO_PREAMBLE_INSTRUCTION;
use crate::llm_client::LlmClient;

pub mod prompts;

/// One model call; the answer comes back with code fences stripped and
/// otherwise verbatim.
pub async fn write_mail(
    job: &JobRecord,
    links: &[String],
    sender: &SenderPersona,
    llm: &LlmClient,
) -> Result<String, AppError> {
    let prompt = build_prompt(job, links, sender);

    let email = llm
        .call_text(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Email composition failed: {e}")))?;

    info!("Composed email for role {:?} ({} chars)", job.role, email.len());
    Ok(email)
}

fn build_prompt(job: &JobRecord, links: &[String], sender: &SenderPersona) -> String {
    let link_list = if links.is_empty() {
        NO_LINKS_PLACEHOLDER.to_string()
    } else {
        links.join("\n")
    };

    COLD_EMAIL_PROMPT_TEMPLATE
        .replace("{sender_name}", &sender.name)
        .replace("{sender_company}", &sender.company)
        .replace("{output_rule}", NO_PREAMBLE_INSTRUCTION)
        .replace("{link_list}", &link_list)
        .replace("{job_description}", &describe_job(job))
}

fn describe_job(job: &JobRecord) -> String {
    // Serialization of four string fields cannot fail; fall back to Debug regardless.
    serde_json::to_string_pretty(job).unwrap_or_else(|_| format!("{job:?}"))
}
