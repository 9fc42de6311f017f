use std::sync::Arc;
use nh_core::{ArticleStorage, Clock, Result, ZeroShotClassifier};
use nh_inference::embeddings::EmbeddingGenerator;
use serde::Serialize;
use tracing::info;

pub mod config;
pub mod dashboard;
pub mod duplicates;
pub mod embedding;
pub mod highlights;
pub mod labeling;
pub mod report;
pub mod retrieval;
pub mod similarity;
pub mod topics;

pub use config::PipelineConfig;
pub use dashboard::{dashboard, featured_articles, other_articles, since_or_yesterday, DashboardView};
pub use duplicates::{cluster_duplicates, detect_duplicates, DuplicateReport};
pub use embedding::embed_missing;
pub use highlights::{run_highlights, update_featured_highlights, HighlightReport};
pub use labeling::label_topics;
pub use report::StageReport;
pub use retrieval::{retrieve, ScoredArticle};
pub use similarity::{cosine_similarity_matrix, SimilarityMatrix};
pub use topics::{cluster_topics, group_topics, TopicReport};

/// Store and collaborators shared by every stage. Handed to each stage
/// explicitly, never held globally.
pub struct PipelineContext {
    pub store: Arc<dyn ArticleStorage>,
    pub embedder: EmbeddingGenerator,
    pub classifier: Arc<dyn ZeroShotClassifier>,
    pub clock: Arc<dyn Clock>,
    pub config: PipelineConfig,
}

impl PipelineContext {
    pub async fn embed(&self) -> Result<StageReport> {
        embed_missing(self.store.as_ref(), &self.embedder).await
    }

    pub async fn duplicates(&self) -> Result<DuplicateReport> {
        detect_duplicates(self.store.as_ref(), &self.config.duplicates).await
    }

    pub async fn topics(&self) -> Result<TopicReport> {
        group_topics(self.store.as_ref(), &self.config.topics).await
    }

    pub async fn labels(&self) -> Result<StageReport> {
        label_topics(self.store.as_ref(), self.classifier.as_ref(), &self.config.labels).await
    }

    pub async fn highlights(&self) -> Result<Vec<HighlightReport>> {
        run_highlights(self.store.as_ref(), &self.config.highlights, self.clock.as_ref()).await
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub embeddings: StageReport,
    pub duplicates: DuplicateReport,
    pub topics: TopicReport,
    pub labels: StageReport,
    pub highlights: Vec<HighlightReport>,
}

/// Every stage in order: embed, duplicates, topics, labels, highlights.
/// An input error stops the run; per-article failures only show up in the report.
pub async fn run_all(ctx: &PipelineContext) -> Result<RunReport> {
    info!("🚀 Running full pipeline");
    let report = RunReport {
        embeddings: ctx.embed().await?,
        duplicates: ctx.duplicates().await?,
        topics: ctx.topics().await?,
        labels: ctx.labels().await?,
        highlights: ctx.highlights().await?,
    };
    info!(
        "✅ Pipeline finished: {} embedded, {} duplicate clusters, {} topics, {} labeled",
        report.embeddings.updated, report.duplicates.clusters, report.topics.clusters, report.labels.updated
    );
    Ok(report)
}

pub mod prelude {
    pub use super::{run_all, PipelineConfig, PipelineContext, RunReport};
    pub use super::config::*;
    pub use super::report::StageReport;
    pub use nh_core::{Article, ArticleFilter, ArticleStorage, Error, Result, Topic};
}
