use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Public struct `EmbeddingProviderConfig` used across Mnemo components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingProviderConfig {
    pub model: String,
    pub api_base: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

/// Embedding backends that turn text into fixed-dimension unit vectors.
///
/// `Hash` is deterministic and fully offline; `Provider` calls an
/// OpenAI-compatible `/embeddings` endpoint. Provider failures propagate to
/// the caller rather than silently degrading, because mixing backends
/// inside one index would corrupt the similarity space.
#[derive(Debug, Clone)]
pub enum TextEmbedder {
    Hash {
        dimensions: usize,
    },
    Provider {
        config: EmbeddingProviderConfig,
        dimensions: usize,
    },
}

impl TextEmbedder {
    /// Width of the vectors this embedder produces.
    pub fn dimensions(&self) -> usize {
        match self {
            TextEmbedder::Hash { dimensions } => (*dimensions).max(1),
            TextEmbedder::Provider { dimensions, .. } => (*dimensions).max(1),
        }
    }

    /// Embeds a single text into a unit vector.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            TextEmbedder::Hash { .. } => Ok(hash_embed(text, self.dimensions())),
            TextEmbedder::Provider { config, .. } => {
                let mut vectors =
                    provider_embed(&[text.to_string()], self.dimensions(), config)?;
                match vectors.pop() {
                    Some(vector) => Ok(vector),
                    None => bail!("embedding provider returned no vector for input"),
                }
            }
        }
    }

    /// Embeds a batch of texts, one vector per input, in input order.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            TextEmbedder::Hash { .. } => Ok(texts
                .iter()
                .map(|text| hash_embed(text, self.dimensions()))
                .collect()),
            TextEmbedder::Provider { config, .. } => {
                provider_embed(texts, self.dimensions(), config)
            }
        }
    }
}

/// Computes cosine similarity for equal-length vectors.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() {
        return 0.0;
    }
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

/// Converts text to a normalized fixed-size vector via FNV-1a token hashing.
fn hash_embed(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];
    for token in text
        .split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        let digest = fnv1a_hash(token.to_ascii_lowercase().as_bytes());
        let bucket = (digest as usize) % dimensions;
        vector[bucket] += if (digest & 1) == 0 { 1.0 } else { -1.0 };
    }
    normalize(&mut vector);
    vector
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector
        .iter()
        .map(|component| component * component)
        .sum::<f32>()
        .sqrt();
    if magnitude > 0.0 {
        for component in vector {
            *component /= magnitude;
        }
    }
}

/// Folds a provider vector into `dimensions` buckets and renormalizes.
fn fold_to_dimensions(values: &[f32], dimensions: usize) -> Vec<f32> {
    let mut folded = vec![0.0f32; dimensions];
    for (position, value) in values.iter().enumerate() {
        folded[position % dimensions] += *value;
    }
    normalize(&mut folded);
    folded
}

fn provider_embed(
    inputs: &[String],
    dimensions: usize,
    config: &EmbeddingProviderConfig,
) -> Result<Vec<Vec<f32>>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let api_base = config.api_base.trim_end_matches('/');
    if api_base.is_empty() {
        bail!("embedding api_base must not be empty");
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms.max(1)))
        .build()
        .context("failed to build embedding http client")?;
    let response = client
        .post(format!("{api_base}/embeddings"))
        .bearer_auth(config.api_key.as_str())
        .json(&serde_json::json!({
            "model": config.model,
            "input": inputs,
        }))
        .send()
        .context("embedding request failed")?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        bail!(
            "embedding provider returned status {status}: {}",
            body.chars().take(240).collect::<String>()
        );
    }

    let payload = response
        .json::<Value>()
        .context("failed to parse embedding response json")?;
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .context("embedding response missing data array")?;
    if data.len() != inputs.len() {
        bail!(
            "embedding response size mismatch: expected {}, got {}",
            inputs.len(),
            data.len()
        );
    }

    let mut vectors = Vec::with_capacity(data.len());
    for item in data {
        let raw = item
            .get("embedding")
            .and_then(Value::as_array)
            .context("embedding item missing embedding array")?;
        let components = raw
            .iter()
            .map(|component| {
                component
                    .as_f64()
                    .map(|value| value as f32)
                    .context("embedding component must be numeric")
            })
            .collect::<Result<Vec<_>>>()?;
        vectors.push(fold_to_dimensions(&components, dimensions));
    }
    Ok(vectors)
}
