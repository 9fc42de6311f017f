use std::fmt;
use nh_core::{EmbeddingProvider, Error, Result};

pub const DEFAULT_DIMENSION: usize = 384;

/// Offline embedder: hashed bag of words, L2 normalised.
///
/// Texts sharing most of their words land close together under cosine
/// similarity, which is all the clustering stages need for local runs.
pub struct DummyModel {
    dimension: usize,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel")
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl DummyModel {
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            dimension: dimension.filter(|d| *d > 0).unwrap_or(DEFAULT_DIMENSION),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

// FNV-1a, stable across runs and platforms.
fn bucket(token: &str, dimension: usize) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % dimension as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            embedding[bucket(&token.to_lowercase(), self.dimension)] += 1.0;
            tokens += 1;
        }
        if tokens == 0 {
            return Err(Error::Collaborator("Cannot embed text without words".to_string()));
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        for value in embedding.iter_mut() {
            *value /= norm;
        }
        Ok(embedding)
    }
}
