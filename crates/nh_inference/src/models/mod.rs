use std::sync::Arc;
use anyhow::anyhow;
use nh_core::{EmbeddingProvider, Error, Result, ZeroShotClassifier};
use tracing::info;
use url::Url;
use crate::zero_shot::{HuggingFaceClassifier, KeywordClassifier};
use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Validates a base url and strips any trailing slash.
pub(crate) fn parse_base_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::External(anyhow!("Invalid model url {}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Inference(format!("Unsupported url scheme: {}", parsed.scheme())));
    }
    Ok(url.trim_end_matches('/').to_string())
}

pub async fn create_embedder(kind: &str, config: Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let model: Arc<dyn EmbeddingProvider> = match kind.trim().to_lowercase().as_str() {
        "dummy" => Arc::new(DummyModel::new(config.model_name.as_deref().and_then(|n| n.parse().ok()))),
        "openai" => Arc::new(OpenAiModel::new(config)?),
        other => {
            return Err(Error::Inference(format!(
                "Unknown embedding model: {} (available: dummy, openai)",
                other
            )))
        }
    };
    info!("🧠 Embedding model initialized (using {})", model.name());
    Ok(model)
}

pub async fn create_classifier(kind: &str, config: Config) -> Result<Arc<dyn ZeroShotClassifier>> {
    let classifier: Arc<dyn ZeroShotClassifier> = match kind.trim().to_lowercase().as_str() {
        "keyword" => Arc::new(KeywordClassifier::new()),
        "huggingface" => Arc::new(HuggingFaceClassifier::new(config)?),
        other => {
            return Err(Error::Inference(format!(
                "Unknown classifier: {} (available: keyword, huggingface)",
                other
            )))
        }
    };
    info!("🏷️ Zero-shot classifier initialized (using {})", classifier.name());
    Ok(classifier)
}
