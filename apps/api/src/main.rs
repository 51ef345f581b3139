mod composer;
mod config;
mod delivery;
mod errors;
mod extraction;
mod llm_client;
mod pipeline;
mod portfolio;
mod routes;
mod scraping;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::delivery::Mailer;
use crate::llm_client::LlmClient;
use crate::portfolio::{ApiEmbedder, Embedder, HashingEmbedder, Portfolio};
use crate::routes::build_router;
use crate::scraping::PageFetcher;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing GROQ_API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cold Mail Generator v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(&config.llm).context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    let fetcher = PageFetcher::new().context("Failed to build page fetcher")?;

    // Build the portfolio index once; handlers only read it
    let embedder: Arc<dyn Embedder> = match &config.portfolio.embedding {
        Some(embedding) => {
            let embedder = ApiEmbedder::connect(embedding)
                .await
                .context("Failed to reach embedding API")?;
            info!(
                "Using embedding model {} ({} dimensions)",
                embedding.model,
                embedder.dimension()
            );
            Arc::new(embedder)
        }
        None => {
            info!("EMBEDDING_API_URL not set; using local hashing embedder");
            Arc::new(HashingEmbedder::default())
        }
    };
    let mut portfolio = Portfolio::new(&config.portfolio, embedder);
    let added = portfolio
        .ensure_loaded()
        .await
        .context("Failed to initialize portfolio index")?;
    info!(
        "Portfolio index ready: {} entries ({} newly indexed)",
        portfolio.len(),
        added
    );
    if portfolio.is_empty() {
        warn!("Portfolio index is empty; emails will carry no portfolio links");
    }

    let mailer = Mailer::new(config.smtp.clone());
    if !mailer.is_configured() {
        warn!("SMTP_SENDER / SMTP_PASSWORD not set; sending emails will fail");
    }

    let state = AppState {
        llm,
        fetcher: Arc::new(fetcher),
        portfolio: Arc::new(portfolio),
        mailer: Arc::new(mailer),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("127.0.0.1:{}", config.port).parse()?;
    info!("Listening on {addr} (default job URL: {})", config.default_job_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
