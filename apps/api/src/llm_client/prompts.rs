// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// this file holds the cross-cutting output rules they splice in.

/// Output rule for prompts whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Return **only the JSON array** — \
    no backticks, no markdown, no explanation.";

/// Output rule for prompts whose answer is shown verbatim.
pub const NO_PREAMBLE_INSTRUCTION: &str = "Do not include any preamble, \
    explanation, or sign-off notes about the task. Just return the email content.";
