//! Text embedding behind a trait seam.
//!
//! `ApiEmbedder` calls an OpenAI-compatible `/embeddings` endpoint and is used
//! whenever one is configured. Without one, `HashingEmbedder` is the fallback:
//! a deterministic feature-hashing bag of tokens. Same input always yields the
//! same vector, across runs and platforms, so a persisted index stays valid
//! between restarts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::portfolio::PortfolioError;

/// Dimension of the default hashing embedder.
pub const DEFAULT_DIMENSION: usize = 2048;

/// Buckets each token is spread over.
const HASHES_PER_TOKEN: u8 = 4;

/// One bucket shared by two different tokens scores at most
/// `1 / HASHES_PER_TOKEN`; anything at or below this is treated as noise.
const HASHING_MIN_SCORE: f32 = 0.3;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Converts text into dense vectors. Implement this to swap in a model-backed
/// embedder without touching the index or its callers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the persisted index.
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Cosine score a match must exceed to be returned.
    fn min_score(&self) -> f32 {
        0.0
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PortfolioError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Hashing fallback
// ────────────────────────────────────────────────────────────────────────────

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in tokenize(text) {
            for seed in 0..HASHES_PER_TOKEN {
                let hash = fnv1a(seed, token.as_bytes());
                let bucket = (hash % self.dimension as u64) as usize;
                // High bit picks the sign so colliding tokens tend to cancel out.
                let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign;
            }
        }

        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-bow-fnv1a-x4"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn min_score(&self) -> f32 {
        HASHING_MIN_SCORE
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PortfolioError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Lowercased tokens; `+`, `#` and inner `.` are kept so `C++`, `C#` and
/// `Node.js` stay whole.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn fnv1a(seed: u8, bytes: &[u8]) -> u64 {
    std::iter::once(&seed)
        .chain(bytes)
        .fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
        })
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Embedding API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Semantic embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct ApiEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    name: String,
    dimension: usize,
}

impl ApiEmbedder {
    /// Builds the client and learns the vector dimension from one request.
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self, PortfolioError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PortfolioError::Embedding(format!("failed to build client: {e}")))?;

        let mut embedder = Self {
            client,
            endpoint: format!("{}/embeddings", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            name: format!("api:{}", config.model),
            dimension: 0,
        };

        let sample = embedder.request(&["dimension check".to_string()]).await?;
        embedder.dimension = sample
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| PortfolioError::Embedding("endpoint returned an empty vector".to_string()))?;

        debug!(
            "Embedding model {} reports {} dimensions",
            embedder.model, embedder.dimension
        );
        Ok(embedder)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PortfolioError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortfolioError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortfolioError::Embedding(format!(
                "API returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PortfolioError::Embedding(format!("invalid response: {e}")))?;
        if parsed.data.len() != texts.len() {
            return Err(PortfolioError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PortfolioError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.request(texts).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(PortfolioError::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                bad.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::index::cosine_similarity;
    use serde_json::json;

    #[test]
    fn test_tokenize_keeps_tech_names() {
        assert_eq!(
            tokenize("React, Node.js, C++ and C#."),
            vec!["react", "node.js", "c++", "and", "c#"]
        );
    }

    #[test]
    fn test_embedding_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("Python, Django, PostgreSQL");
        let b = embedder.embed_one("Python, Django, PostgreSQL");

        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSION);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let v = HashingEmbedder::default().embed_one("  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_one("Machine Learning");
        let related = embedder.embed_one("Python, TensorFlow, Machine Learning");
        let unrelated = embedder.embed_one("Swift, iOS, Xcode");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_unrelated_tokens_stay_below_min_score() {
        let embedder = HashingEmbedder::default();
        for (query, entry) in [
            ("Golang", "Go, PostgreSQL"),
            ("Postgres", "React, Node.js"),
            ("Rust", "Swift, iOS"),
        ] {
            let score = cosine_similarity(&embedder.embed_one(query), &embedder.embed_one(entry));
            assert!(
                score <= embedder.min_score(),
                "{query} vs {entry} scored {score}"
            );
        }

        let genuine = cosine_similarity(
            &embedder.embed_one("Go"),
            &embedder.embed_one("Go, PostgreSQL"),
        );
        assert!(genuine > embedder.min_score());
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let embedder = HashingEmbedder::default();
        let texts = vec!["Go".to_string(), "Rust".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(vectors[0], embedder.embed_one("Go"));
        assert_eq!(vectors[1], embedder.embed_one("Rust"));
    }

    fn api_config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            api_url: url.to_string(),
            model: "all-minilm".to_string(),
            api_key: Some("sk_test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_api_embedder_learns_dimension_and_orders_by_index() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::Regex("dimension check".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/embeddings")
            .match_body(mockito::Matcher::Regex("Kubernetes".to_string()))
            .match_header("authorization", "Bearer sk_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"data": [
                    {"index": 1, "embedding": [0.0, 1.0, 0.0]},
                    {"index": 0, "embedding": [1.0, 0.0, 0.0]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let embedder = ApiEmbedder::connect(&api_config(&server.url())).await.unwrap();
        assert_eq!(embedder.dimension(), 3);
        assert_eq!(embedder.name(), "api:all-minilm");

        let vectors = embedder
            .embed(&["Docker".to_string(), "Kubernetes".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_api_embedder_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let err = ApiEmbedder::connect(&api_config(&server.url()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PortfolioError::Embedding(ref m) if m.contains("401")));
    }
}
