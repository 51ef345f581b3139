//! Response parser — turns a model's free-text answer into a JSON array.
//!
//! Strategies run in a fixed order, each returning a tagged [`ParseOutcome`]:
//! strict parse of the whole text, then a regex salvage of the first
//! array-of-objects substring, then the same substring with non-strict JSON
//! (single quotes, trailing commas) repaired.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::strip_code_fences;

/// Why no job array could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The response is prose; nothing array-shaped was found.
    #[error("No JSON array found in the model response")]
    NoStructuredData,

    /// Something array-shaped was found but it is not valid job JSON.
    #[error("Failed to decode JSON from the model response: {reason}")]
    MalformedJson { reason: String },
}

/// Result of a single parsing strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Vec<Value>),
    NotFound,
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Strict,
    Salvage,
    LenientSalvage,
}

impl ParseStrategy {
    pub const ORDER: [ParseStrategy; 3] = [
        ParseStrategy::Strict,
        ParseStrategy::Salvage,
        ParseStrategy::LenientSalvage,
    ];

    pub fn attempt(self, text: &str) -> ParseOutcome {
        match self {
            ParseStrategy::Strict => parse_strict(text),
            ParseStrategy::Salvage => match find_array_candidate(text) {
                Some(candidate) => parse_array(candidate),
                None => ParseOutcome::NotFound,
            },
            ParseStrategy::LenientSalvage => match find_array_candidate(text) {
                Some(candidate) => parse_array(&relax_json(candidate)),
                None => ParseOutcome::NotFound,
            },
        }
    }
}

/// Parses a model response into the JSON array it carries.
pub fn parse_json_array(raw: &str) -> Result<Vec<Value>, ExtractionError> {
    let text = strip_code_fences(raw);
    let mut first_failure: Option<String> = None;

    for strategy in ParseStrategy::ORDER {
        match strategy.attempt(text) {
            ParseOutcome::Parsed(values) => {
                debug!(
                    "Parsed {} element(s) with {:?} strategy",
                    values.len(),
                    strategy
                );
                return Ok(values);
            }
            ParseOutcome::NotFound => {}
            ParseOutcome::Malformed(reason) => {
                debug!("{:?} strategy failed: {}", strategy, reason);
                first_failure.get_or_insert(reason);
            }
        }
    }

    Err(match first_failure {
        Some(reason) => ExtractionError::MalformedJson { reason },
        None => ExtractionError::NoStructuredData,
    })
}

fn parse_strict(text: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(values)) => ParseOutcome::Parsed(values),
        // Only the salvage pattern decides whether structured data is present.
        _ => ParseOutcome::NotFound,
    }
}

fn parse_array(candidate: &str) -> ParseOutcome {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(values)) => ParseOutcome::Parsed(values),
        Ok(_) => ParseOutcome::Malformed("extracted data is not a JSON list".to_string()),
        Err(e) => ParseOutcome::Malformed(e.to_string()),
    }
}

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("valid array regex"))
}

/// Finds the first array-of-objects substring.
///
/// The regex locates where the array starts and gives the non-greedy end;
/// when the brackets from that start balance, the balanced span wins so that
/// nested arrays of objects survive.
fn find_array_candidate(text: &str) -> Option<&str> {
    let found = array_pattern().find(text)?;
    let start = found.start();

    match balanced_end(&text[start..]) {
        Some(len) => Some(&text[start..start + len]),
        None => Some(found.as_str()),
    }
}

/// Byte length of the bracketed span at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

/// Repairs the common non-strict JSON a model emits: single-quoted strings
/// and trailing commas before a closing bracket.
fn relax_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        match quote {
            Some(q) => {
                if ch == '\\' && i + 1 < chars.len() {
                    let next = chars[i + 1];
                    if q == '\'' && next == '\'' {
                        out.push('\'');
                    } else {
                        out.push(ch);
                        out.push(next);
                    }
                    i += 2;
                    continue;
                }
                if ch == q {
                    quote = None;
                    out.push('"');
                } else if q == '\'' && ch == '"' {
                    out.push_str("\\\"");
                } else {
                    out.push(ch);
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    out.push('"');
                }
                ',' => {
                    let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                    if !matches!(next, Some('}') | Some(']')) {
                        out.push(ch);
                    }
                }
                _ => out.push(ch),
            },
        }

        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_array_returned_unmodified() {
        let raw = r#"[{"role":"Backend Engineer","experience":"3 years","skills":["Go","SQL"],"description":"Build APIs"}]"#;
        let values = parse_json_array(raw).unwrap();
        assert_eq!(values, serde_json::from_str::<Vec<Value>>(raw).unwrap());
    }

    #[test]
    fn test_fenced_array_is_unwrapped() {
        let values = parse_json_array("```json\n[{\"role\":\"X\"}]\n```").unwrap();
        assert_eq!(values, vec![json!({"role": "X"})]);
    }

    #[test]
    fn test_empty_array_is_a_valid_answer() {
        assert_eq!(parse_json_array("[]").unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_prose_wrapped_array_is_salvaged() {
        let raw = "Sure! Here are the jobs I found:\n\n\
            [{\"role\": \"SRE\", \"skills\": [\"Linux\", \"Kubernetes\"]}, {\"role\": \"QA\"}]\n\n\
            Let me know if you need anything else.";
        let values = parse_json_array(raw).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["skills"], json!(["Linux", "Kubernetes"]));
        assert_eq!(values[1]["role"], "QA");
    }

    #[test]
    fn test_array_nested_in_object_is_salvaged() {
        let raw = r#"{"jobs": [{"role": "Designer", "skills": ["Figma"]}]}"#;
        let values = parse_json_array(raw).unwrap();
        assert_eq!(values, vec![json!({"role": "Designer", "skills": ["Figma"]})]);
    }

    #[test]
    fn test_prose_without_array_is_no_structured_data() {
        let raw = "I could not find any job postings on this page.";
        assert_eq!(
            parse_json_array(raw).unwrap_err(),
            ExtractionError::NoStructuredData
        );
    }

    #[test]
    fn test_lone_object_is_no_structured_data() {
        let err = parse_json_array(r#"{"role": "X"}"#).unwrap_err();
        assert_eq!(err, ExtractionError::NoStructuredData);
    }

    #[test]
    fn test_invalid_array_is_malformed() {
        let raw = r#"Result: [{"role": "X" "experience": "2 years"}]"#;
        assert!(matches!(
            parse_json_array(raw).unwrap_err(),
            ExtractionError::MalformedJson { .. }
        ));
    }

    #[test]
    fn test_unterminated_array_is_no_structured_data() {
        assert_eq!(
            parse_json_array("[{\"role\": \"X\"").unwrap_err(),
            ExtractionError::NoStructuredData
        );
        assert_eq!(
            parse_json_array("Here: [{\"role\": \"X\"").unwrap_err(),
            ExtractionError::NoStructuredData
        );
    }

    #[test]
    fn test_bracketed_prose_is_no_structured_data() {
        assert_eq!(
            parse_json_array("[No job postings were found on this page.]").unwrap_err(),
            ExtractionError::NoStructuredData
        );
    }

    #[test]
    fn test_strict_strategy_never_reports_malformed() {
        assert_eq!(
            ParseStrategy::Strict.attempt(r#"[{"role": "X" "skills": []}]"#),
            ParseOutcome::NotFound
        );
    }

    #[test]
    fn test_single_quotes_and_trailing_commas_are_repaired() {
        let raw = "Here you go: [{'role': 'Data Engineer', 'skills': ['Spark', 'SQL',],}]";
        let values = parse_json_array(raw).unwrap();
        assert_eq!(
            values,
            vec![json!({"role": "Data Engineer", "skills": ["Spark", "SQL"]})]
        );
    }

    #[test]
    fn test_apostrophe_inside_double_quotes_survives_relaxing() {
        let relaxed = relax_json(r#"[{"role": "Founder's Associate",}]"#);
        assert_eq!(relaxed, r#"[{"role": "Founder's Associate"}]"#);
    }

    #[test]
    fn test_strict_strategy_ignores_non_array_json() {
        assert_eq!(
            ParseStrategy::Strict.attempt(r#"{"a": 1}"#),
            ParseOutcome::NotFound
        );
    }

    #[test]
    fn test_salvage_strategy_reports_missing_candidate() {
        assert_eq!(
            ParseStrategy::Salvage.attempt("no brackets here"),
            ParseOutcome::NotFound
        );
    }
}
