//! Job Extractor — turns cleaned careers-page text into structured job records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::prompts::JOB_EXTRACT_PROMPT_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{LlmClient, LlmError};

pub mod parser;
pub mod prompts;

pub use parser::{parse_json_array, ExtractionError};

/// Page text beyond this many characters is not sent to the model.
pub const MAX_PAGE_CHARS: usize = 3000;

/// One job posting extracted from scraped text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
    /// Always a list of short strings, usable as a similarity query.
    #[serde(default, deserialize_with = "skill_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

/// Sends the page text to the model and parses its answer into job records.
pub async fn extract_jobs(cleaned_text: &str, llm: &LlmClient) -> Result<Vec<JobRecord>, AppError> {
    let prompt = build_prompt(truncate_chars(cleaned_text, MAX_PAGE_CHARS));

    let response = llm
        .call(&prompt)
        .await
        .map_err(|e| AppError::Llm(format!("Job extraction failed: {e}")))?;
    let raw = response
        .text()
        .ok_or_else(|| AppError::Llm(format!("Job extraction failed: {}", LlmError::EmptyContent)))?;

    debug!("LLM raw extraction response: {raw}");

    let values = parse_json_array(raw)?;
    let jobs = records_from_values(values)?;

    info!("Extracted {} job record(s)", jobs.len());
    Ok(jobs)
}

/// Scraped text goes in last so placeholder-like text on the page stays literal.
fn build_prompt(page_data: &str) -> String {
    JOB_EXTRACT_PROMPT_TEMPLATE
        .replace("{output_rule}", JSON_ONLY_INSTRUCTION)
        .replace("{page_data}", page_data)
}

/// Maps parsed JSON values onto job records.
pub fn records_from_values(values: Vec<Value>) -> Result<Vec<JobRecord>, ExtractionError> {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            if !value.is_object() {
                return Err(ExtractionError::MalformedJson {
                    reason: format!("element {idx} is not a job object"),
                });
            }
            serde_json::from_value::<JobRecord>(value).map_err(|e| ExtractionError::MalformedJson {
                reason: format!("element {idx}: {e}"),
            })
        })
        .collect()
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accepts a list of skills or a comma-separated string of them.
fn skill_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    };

    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
