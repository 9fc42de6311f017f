use std::fmt;
use std::sync::Arc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use nh_core::{Classification, Error, Result, ZeroShotClassifier};
use crate::models::parse_base_url;
use crate::{Config, ModelConfig};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
}

/// The hosted API answers either with parallel arrays or a list of pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Parallel { labels: Vec<String>, scores: Vec<f32> },
    Pairs(Vec<LabelScore>),
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

impl ZeroShotResponse {
    fn into_classification(self) -> Result<Classification> {
        let labels = match self {
            ZeroShotResponse::Parallel { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(Error::Collaborator(format!(
                        "Classifier returned {} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                labels.into_iter().zip(scores).collect()
            }
            ZeroShotResponse::Pairs(pairs) => pairs.into_iter().map(|p| (p.label, p.score)).collect(),
        };
        Ok(Classification::ranked(labels))
    }
}

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub base_url: String,
    pub model_name: String,
    pub api_key: Option<String>,
}

impl ModelConfig for HuggingFaceConfig {
    fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(config.model_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?,
            model_name: config.model_name.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }
}

/// Zero-shot classification through the Hugging Face inference API.
pub struct HuggingFaceClassifier {
    client: Arc<Client>,
    config: HuggingFaceConfig,
}

impl fmt::Debug for HuggingFaceClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceClassifier")
            .field("base_url", &self.config.base_url)
            .field("model_name", &self.config.model_name)
            .field("api_key", &self.config.api_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HuggingFaceClassifier {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Client::new()),
            config: HuggingFaceConfig::from_config(&config)?,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.config.base_url, self.config.model_name)
    }
}

#[async_trait::async_trait]
impl ZeroShotClassifier for HuggingFaceClassifier {
    fn name(&self) -> &str {
        "HuggingFace"
    }

    async fn classify(&self, text: &str, candidate_labels: &[String]) -> Result<Classification> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                multi_label: false,
            },
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("Classification request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Collaborator(format!("Classification request returned {}", status)));
        }

        response
            .json::<ZeroShotResponse>()
            .await
            .map_err(|e| Error::Collaborator(format!("Invalid classification response: {}", e)))?
            .into_classification()
    }
}
