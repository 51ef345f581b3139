use std::sync::Arc;

use crate::config::Config;
use crate::delivery::Mailer;
use crate::llm_client::LlmClient;
use crate::portfolio::Portfolio;
use crate::scraping::PageFetcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub fetcher: Arc<PageFetcher>,
    /// Initialized before the router is built; read-only afterwards.
    pub portfolio: Arc<Portfolio>,
    pub mailer: Arc<Mailer>,
    pub config: Config,
}
