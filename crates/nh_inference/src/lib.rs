use nh_core::Result;

pub mod models;
pub mod embeddings;
pub mod zero_shot;

/// Collaborator settings shared by the embedding and classification backends.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    /// Base url of the remote API; each backend has its own default.
    pub model_url: Option<String>,
}

impl Config {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model_url(mut self, model_url: impl Into<String>) -> Self {
        self.model_url = Some(model_url.into());
        self
    }
}

/// Backend specific settings resolved from the shared `Config`.
pub trait ModelConfig: Sized {
    fn from_config(config: &Config) -> Result<Self>;
}

pub mod prelude {
    pub use super::{Config, ModelConfig};
    pub use super::models::{create_classifier, create_embedder};
    pub use super::embeddings::EmbeddingGenerator;
    pub use nh_core::{Article, Classification, EmbeddingProvider, Error, Result, ZeroShotClassifier};
}

pub use models::{create_classifier, create_embedder};
