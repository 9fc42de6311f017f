use std::fmt;
use std::sync::Arc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use nh_core::{EmbeddingProvider, Error, Result};
use tracing::debug;
use super::parse_base_url;
use crate::{Config, ModelConfig};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-ada-002";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct OpenAiModelConfig {
    pub base_url: String,
    pub model_name: String,
    pub api_key: String,
}

impl ModelConfig for OpenAiModelConfig {
    fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Inference("OpenAI API key is required".to_string()))?;
        Ok(Self {
            base_url: parse_base_url(config.model_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?,
            model_name: config.model_name.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
        })
    }
}

/// Embeddings from any OpenAI compatible `/embeddings` endpoint.
pub struct OpenAiModel {
    client: Arc<Client>,
    config: OpenAiModelConfig,
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.config.base_url)
            .field("model_name", &self.config.model_name)
            .finish()
    }
}

impl OpenAiModel {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Client::new()),
            config: OpenAiModelConfig::from_config(&config)?,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiModel {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.config.model_name,
        };

        let response = self.client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Collaborator(format!("Embedding request returned {}", status)));
        }

        let body = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Collaborator(format!("Invalid embedding response: {}", e)))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| Error::Collaborator("Embedding response had no data".to_string()))?;
        debug!("Embedded {} chars into {} dimensions", text.len(), embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_requires_api_key() {
        let result = OpenAiModel::new(Config::default());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Inference error: OpenAI API key is required");

        let result = OpenAiModel::new(Config::default().with_api_key("test-key"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = OpenAiModelConfig::from_config(&Config::default().with_api_key("test-key")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model_name, DEFAULT_MODEL);

        let config = OpenAiModelConfig::from_config(
            &Config::default().with_api_key("test-key").with_model_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let model = OpenAiModel::new(Config::default().with_api_key("secret-key")).unwrap();
        assert!(!format!("{:?}", model).contains("secret-key"));
    }

    #[test]
    fn test_response_parsing() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2], "index": 0}], "model": "m"}"#).unwrap();
        assert_eq!(body.data[0].embedding, vec![0.1, 0.2]);
    }
}
