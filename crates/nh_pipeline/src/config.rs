use nh_core::{Error, Result, Topic};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub embedding: EmbeddingConfig,
    pub duplicates: DuplicateConfig,
    pub topics: TopicConfig,
    pub labels: LabelConfig,
    pub highlights: HighlightConfig,
    pub dashboard: DashboardConfig,
    pub retrieval: RetrievalConfig,
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.max_chars == 0 {
            return Err(Error::Input("embedding.max_chars must be positive".to_string()));
        }
        self.duplicates.validate()?;
        self.topics.validate()?;
        if self.labels.candidate_labels.is_empty() {
            return Err(Error::Input("labels.candidate_labels must not be empty".to_string()));
        }
        if self.labels.max_chars == 0 {
            return Err(Error::Input("labels.max_chars must be positive".to_string()));
        }
        self.highlights.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Input("retrieval.top_k must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub max_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { max_chars: 8191 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    /// Minimum cosine *similarity* for two articles to count as duplicates.
    /// Clustering stops merging at the cosine *distance* `1 - threshold`.
    pub threshold: f64,
}

impl DuplicateConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(Error::Input(format!(
                "duplicates.threshold must be in (0, 1), got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn distance_cutoff(&self) -> f64 {
        1.0 - self.threshold
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self { threshold: 0.85 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Euclidean,
    Cosine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub min_cluster_size: usize,
    pub min_samples: usize,
    pub metric: Metric,
    /// Project embeddings onto the unit sphere before clustering.
    pub normalize: bool,
    /// Reduce to this many principal components before clustering.
    pub components: Option<usize>,
}

impl TopicConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(Error::Input("topics.min_cluster_size must be at least 2".to_string()));
        }
        if self.min_samples == 0 {
            return Err(Error::Input("topics.min_samples must be positive".to_string()));
        }
        if self.components == Some(0) {
            return Err(Error::Input("topics.components must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            min_samples: 1,
            metric: Metric::Euclidean,
            normalize: false,
            components: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub candidate_labels: Vec<Topic>,
    /// Classifier input limit, in characters of `title\ntext`.
    pub max_chars: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            candidate_labels: Topic::ALL.to_vec(),
            max_chars: 2048,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub top_k: usize,
    pub similarity_threshold: f64,
    pub keyword_boost: usize,
    pub keywords: Vec<String>,
    pub categories: Vec<Topic>,
}

impl HighlightConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Input("highlights.top_k must be positive".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Input(format!(
                "highlights.similarity_threshold must be in [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.9,
            keyword_boost: 5,
            keywords: ["breaking", "exclusive", "just in", "confirmed", "revealed"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            categories: Topic::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub featured_limit: usize,
    pub others_limit: usize,
    pub keyword_boost: usize,
    pub duplicate_boost: usize,
    /// Matched against the title only.
    pub keywords: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            featured_limit: 3,
            others_limit: 12,
            keyword_boost: 5,
            duplicate_boost: 1,
            keywords: ["breaking", "exclusive", "confirmed"].iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}
