//! Text embedders for the debate history index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{BackendConfig, EmbeddingConfig, EmbeddingProvider};
use crate::error::DebateError;

/// Turns texts into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DebateError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, DebateError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DebateError::Embedding("embedder returned no vectors".to_string()))
    }
}

/// Offline bag-of-words embedder using FNV-1a feature hashing.
///
/// Deterministic across runs, so vectors written to the store stay
/// comparable with later queries.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
        {
            let hash = fnv1a(token.as_bytes());
            let idx = (hash % self.dimensions as u64) as usize;
            // Sign bit spreads collisions instead of stacking them.
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DebateError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Embedder backed by Ollama's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(backend: &BackendConfig, model: impl Into<String>) -> Result<Self, DebateError> {
        let http = reqwest::Client::builder()
            .timeout(backend.timeout())
            .build()
            .map_err(|e| DebateError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: backend.api_base.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DebateError> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DebateError::Embedding(e.to_string()))?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| DebateError::Embedding(e.to_string()))?;

        if body.embeddings.len() != texts.len() {
            return Err(DebateError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings)
    }
}

/// Construct the configured embedder once, for sharing across components.
pub fn build_embedder(
    embedding: &EmbeddingConfig,
    backend: &BackendConfig,
) -> Result<Arc<dyn Embedder>, DebateError> {
    Ok(match embedding.provider {
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(embedding.dimensions)),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::new(backend, &embedding.model)?),
    })
}

/// Cosine similarity; zero for mismatched or zero-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("Should the minimum wage be raised?");
        let b = embedder.embed_text("Should the minimum wage be raised?");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let embedder = HashingEmbedder::new(256);
        let q = embedder.embed_text("Should the minimum wage be raised nationally?");
        let near = embedder.embed_text("Raising the minimum wage nationally helps workers.");
        let far = embedder.embed_text("Space exploration deserves more funding.");
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_embed_one() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed_one("hello world").await.unwrap();
        assert_eq!(v, embedder.embed_text("hello world"));
    }
}
