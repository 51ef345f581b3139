// All LLM prompt constants for job extraction.

/// Job extraction prompt. Replace `{page_data}` and `{output_rule}` before sending.
pub const JOB_EXTRACT_PROMPT_TEMPLATE: &str = r#"### SCRAPED TEXT FROM WEBSITE:
{page_data}

### INSTRUCTION:
You are an AI job parser. The scraped text is from the careers page of a website.
From the provided job listings text, extract every job posting into the JSON format below.

Include:
- "role": Job title
- "experience": Mentioned years or seniority level
- "skills": A list of relevant technical or soft skills, either mentioned explicitly OR logically inferred from the role/description
- "description": One-line summary of the job

Even if skills are not explicitly mentioned, infer them using your knowledge of similar roles. For example:
- "Data Scientist" → ["Python", "Statistics", "Machine Learning"]
- "Frontend Engineer" → ["JavaScript", "React", "HTML", "CSS"]

Each skill must be a short phrase (one to three words).

{output_rule}

### OUTPUT FORMAT:
[
    {
        "role": "string",
        "experience": "string",
        "skills": ["string", ...],
        "description": "string"
    }
]
"#;
