use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if `GROQ_API_KEY` is missing; SMTP credentials are optional
/// and only surface as a delivery failure when a send is attempted.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub portfolio: PortfolioConfig,
    pub sender: SenderPersona,
    pub smtp: SmtpConfig,
    pub default_job_url: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct PortfolioConfig {
    pub csv_path: PathBuf,
    pub vectorstore_dir: PathBuf,
    pub match_count: usize,
    /// Semantic embeddings endpoint; the hashing embedder is used when absent.
    pub embedding: Option<EmbeddingConfig>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// Who the composed emails are written as.
#[derive(Debug, Clone)]
pub struct SenderPersona {
    pub name: String,
    pub company: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            llm: LlmConfig {
                api_key: optional("GROQ_API_KEY").with_context(|| {
                    "Required environment variable 'GROQ_API_KEY' is not set".to_string()
                })?,
                api_url: var("LLM_API_URL", "https://api.groq.com/openai/v1"),
                model: var("LLM_MODEL", "llama3-70b-8192"),
            },
            portfolio: PortfolioConfig {
                csv_path: PathBuf::from(var("PORTFOLIO_CSV", "resource/my_portfolio.csv")),
                vectorstore_dir: PathBuf::from(var("VECTORSTORE_DIR", "vectorstore")),
                match_count: parse_match_count(&var("MATCH_COUNT", "2"))?,
                embedding: match (optional("EMBEDDING_API_URL"), optional("EMBEDDING_MODEL")) {
                    (Some(api_url), Some(model)) => Some(EmbeddingConfig {
                        api_url,
                        model,
                        api_key: optional("EMBEDDING_API_KEY"),
                    }),
                    (None, None) => None,
                    _ => bail!("EMBEDDING_API_URL and EMBEDDING_MODEL must be set together"),
                },
            },
            sender: SenderPersona {
                name: var("SENDER_NAME", "Aroon"),
                company: var("SENDER_COMPANY", "AtliQ"),
            },
            smtp: SmtpConfig {
                host: var("SMTP_HOST", "smtp.gmail.com"),
                port: var("SMTP_PORT", "465")
                    .parse::<u16>()
                    .context("SMTP_PORT must be a valid port number")?,
                sender: optional("SMTP_SENDER"),
                password: optional("SMTP_PASSWORD"),
            },
            default_job_url: var(
                "JOB_URL",
                "https://boards.greenhouse.io/discord/jobs/5890957",
            ),
            port: var("PORT", "8501")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
        })
    }
}

fn parse_match_count(raw: &str) -> Result<usize> {
    let count = raw
        .trim()
        .parse::<usize>()
        .context("MATCH_COUNT must be a positive integer")?;
    if count == 0 {
        bail!("MATCH_COUNT must be a positive integer, got 0");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk_test")])).unwrap();
        assert_eq!(config.llm.model, "llama3-70b-8192");
        assert_eq!(config.portfolio.match_count, 2);
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.sender.company, "AtliQ");
        assert_eq!(config.port, 8501);
        assert!(config.smtp.sender.is_none());
        assert!(config.portfolio.embedding.is_none());
    }

    #[test]
    fn test_missing_smtp_credentials_do_not_fail_startup() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("SMTP_SENDER", "  "),
        ]))
        .unwrap();
        assert!(config.smtp.sender.is_none());
        assert!(config.smtp.password.is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("PORT", "not-a-port"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_match_count_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("MATCH_COUNT", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MATCH_COUNT"));
    }

    #[test]
    fn test_embedding_endpoint_configured() {
        let config = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("EMBEDDING_API_URL", "http://localhost:11434/v1"),
            ("EMBEDDING_MODEL", "all-minilm"),
        ]))
        .unwrap();

        let embedding = config.portfolio.embedding.unwrap();
        assert_eq!(embedding.model, "all-minilm");
        assert!(embedding.api_key.is_none());
    }

    #[test]
    fn test_embedding_url_without_model_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("EMBEDDING_API_URL", "http://localhost:11434/v1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("EMBEDDING_MODEL"));
    }
}
