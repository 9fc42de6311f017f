use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::types::{Article, Topic};
use crate::Result;

/// Predicates the pipeline stages select articles by. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    pub has_embedding: Option<bool>,
    pub predicted_topic: Option<Topic>,
    /// Inclusive lower bound on `ingested_at`.
    pub ingested_since: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
}

impl ArticleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_embedding() -> Self {
        Self {
            has_embedding: Some(true),
            ..Self::default()
        }
    }

    pub fn without_embedding() -> Self {
        Self {
            has_embedding: Some(false),
            ..Self::default()
        }
    }

    pub fn topic(mut self, topic: Topic) -> Self {
        self.predicted_topic = Some(topic);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.ingested_since = Some(since);
        self
    }

    pub fn featured(mut self, is_featured: bool) -> Self {
        self.is_featured = Some(is_featured);
        self
    }

    pub fn matches(&self, article: &Article) -> bool {
        if let Some(has_embedding) = self.has_embedding {
            if article.has_embedding() != has_embedding {
                return false;
            }
        }
        if let Some(topic) = self.predicted_topic {
            if article.predicted_topic != Some(topic) {
                return false;
            }
        }
        if let Some(since) = self.ingested_since {
            if article.ingested_at < since {
                return false;
            }
        }
        if let Some(is_featured) = self.is_featured {
            if article.is_featured != is_featured {
                return false;
            }
        }
        true
    }
}

/// A single field write applied by `ArticleStorage::update_by_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Embedding(Vec<f32>),
    DuplicateCluster(usize),
    TopicCluster(Option<usize>),
    PredictedTopic(Topic),
    Featured {
        is_featured: bool,
        featured_at: Option<DateTime<Utc>>,
    },
}

impl FieldUpdate {
    pub fn apply(&self, article: &mut Article) {
        match self {
            FieldUpdate::Embedding(embedding) => article.embedding = Some(embedding.clone()),
            FieldUpdate::DuplicateCluster(label) => article.duplicate_cluster_id = Some(*label),
            FieldUpdate::TopicCluster(label) => article.topic_cluster_id = *label,
            FieldUpdate::PredictedTopic(topic) => article.predicted_topic = Some(*topic),
            FieldUpdate::Featured { is_featured, featured_at } => {
                article.is_featured = *is_featured;
                article.featured_at = *featured_at;
            }
        }
    }
}

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert or replace an article by id
    async fn store_article(&self, article: &Article) -> Result<()>;

    /// Get a single article by id
    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// Find every article matching the filter
    async fn find(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;

    /// Apply field updates to one article. Unknown ids are a persistence error.
    async fn update_by_id(&self, id: &str, updates: &[FieldUpdate]) -> Result<()>;

    /// Number of stored articles
    async fn count(&self) -> Result<usize>;
}
