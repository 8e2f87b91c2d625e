//! Embedding providers
//!
//! The index never computes meaning itself; it delegates to an [`Embedder`].
//! Two providers are built in: a deterministic local hashed n-gram embedder
//! (no network, useful offline and in tests) and an HTTP client for
//! OpenAI-style embedding endpoints.

use crate::index::{IndexError, IndexResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Turns batches of texts into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, recorded with the collection
    fn model_name(&self) -> &str;

    /// Dimensionality of produced vectors
    fn dims(&self) -> usize;

    /// Embeds a batch of texts, one vector per input in input order
    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>>;
}

/// Deterministic local embedder based on hashed character trigrams
///
/// Each lowercase trigram of the text is hashed into one of `dims` buckets
/// and the resulting count vector is L2-normalized. Not a semantic model,
/// but stable across processes and good enough for lexical similarity.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn bucket(&self, ngram: &str) -> usize {
        let digest = Sha256::digest(ngram.as_bytes());
        let mut value = [0u8; 8];
        value.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(value) % self.dims as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        for window in chars.windows(3) {
            let ngram: String = window.iter().collect();
            vector[self.bucket(&ngram)] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hashed-ngram-v1"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

/// Client for OpenAI-style `POST {endpoint}` embedding APIs
///
/// Sends `{"model": ..., "input": [...]}` and reads vectors from
/// `data[].embedding`. The API key, when configured, is sent as a bearer
/// token.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: url::Url,
    model: String,
    dims: usize,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: &str,
        model: &str,
        dims: usize,
        api_key: Option<String>,
    ) -> IndexResult<Self> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| IndexError::Embedding(format!("Invalid endpoint URL: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            model: model.to_string(),
            dims,
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> IndexResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.endpoint.clone()).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexError::Embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Embedding(format!(
                "Embedding endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("Malformed response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(IndexError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        let mut vectors = Vec::with_capacity(body.data.len());
        for row in body.data {
            if row.embedding.len() != self.dims {
                return Err(IndexError::Dimension {
                    expected: self.dims,
                    got: row.embedding.len(),
                });
            }
            vectors.push(row.embedding);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["pricing starts at ten dollars".to_string()];

        let a = embedder.embed(&texts).await.unwrap();
        let b = embedder.embed(&texts).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hash_embedder_dims_and_norm() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder
            .embed(&["some reasonable body of text".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors[0].len(), 64);
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_embedder_distinguishes_texts() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder
            .embed(&[
                "enterprise pricing plans".to_string(),
                "completely unrelated gardening tips".to_string(),
            ])
            .await
            .unwrap();

        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn test_hash_embedder_short_text_is_zero_vector() {
        // Fewer than three chars means no trigrams at all.
        let embedder = HashEmbedder::new(64);
        let vectors = embedder.embed(&["ab".to_string()]).await.unwrap();
        assert!(vectors[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_http_embedder_rejects_bad_endpoint() {
        assert!(HttpEmbedder::new("not a url", "model", 8, None).is_err());
    }
}
