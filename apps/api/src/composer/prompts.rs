// All LLM prompt constants for email composition.

/// Cold email prompt. Replace `{job_description}`, `{sender_name}`,
/// `{sender_company}`, `{link_list}` and `{output_rule}` before sending.
pub const COLD_EMAIL_PROMPT_TEMPLATE: &str = r#"### JOB DESCRIPTION:
{job_description}

### INSTRUCTION:
You are {sender_name}, a Business Development Executive at {sender_company}, an AI & software consulting company
enabling the seamless integration of business processes through automated tools.
Over our experience, we have empowered numerous enterprises with tailored solutions for
process optimization, cost reduction, and heightened overall efficiency.
Write a professional cold email to the client regarding the job mentioned above, describing how
{sender_company} can fulfil their needs. Add the most relevant of the portfolio links below to
showcase {sender_company}'s work.
Remember you are {sender_name}, BDE at {sender_company}.
{output_rule}

### RELEVANT PORTFOLIO LINKS:
{link_list}

### COLD EMAIL (NO PREAMBLE):
"#;

/// Placeholder for the link list when no portfolio entry matched.
pub const NO_LINKS_PLACEHOLDER: &str = "(no closely matching portfolio links; do not invent any)";
