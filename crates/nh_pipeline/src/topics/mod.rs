pub mod hdbscan;
pub mod pca;

use nh_core::{Article, ArticleFilter, ArticleStorage, FieldUpdate, Result};
use serde::Serialize;
use tracing::info;
use crate::config::TopicConfig;
use crate::report::{write_updates, StageReport};
use crate::similarity::{check_dimensions, embeddings_of};
use self::hdbscan::{hdbscan, HdbscanParams};
pub use self::pca::Pca;

/// Optional projection applied to the embeddings before clustering.
pub trait Reducer: Send + Sync {
    fn name(&self) -> &str;

    fn reduce(&self, vectors: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>>;
}

/// Projects every vector onto the unit sphere. Zero vectors are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitNormalize;

impl Reducer for UnitNormalize {
    fn name(&self) -> &str {
        "unit-normalize"
    }

    fn reduce(&self, vectors: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>> {
        Ok(vectors
            .into_iter()
            .map(|v| {
                let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm == 0.0 {
                    v
                } else {
                    v.into_iter().map(|x| x / norm).collect()
                }
            })
            .collect())
    }
}

/// The reducer `config` asks for, if any.
pub fn reducer_for(config: &TopicConfig) -> Option<Box<dyn Reducer>> {
    match (config.components, config.normalize) {
        (Some(components), normalize) => Some(Box::new(Pca { components, normalize })),
        (None, true) => Some(Box::new(UnitNormalize)),
        (None, false) => None,
    }
}

/// One topic label per article in input order, `None` for noise.
pub fn cluster_topics(articles: &[Article], config: &TopicConfig) -> Result<Vec<Option<usize>>> {
    let reducer = reducer_for(config);
    cluster_topics_with(articles, config, reducer.as_deref())
}

pub fn cluster_topics_with(
    articles: &[Article],
    config: &TopicConfig,
    reducer: Option<&dyn Reducer>,
) -> Result<Vec<Option<usize>>> {
    config.validate()?;
    let embeddings = embeddings_of(articles)?;
    check_dimensions(&embeddings)?;

    let mut points: Vec<Vec<f64>> = embeddings
        .iter()
        .map(|e| e.iter().map(|x| f64::from(*x)).collect())
        .collect();
    if let Some(reducer) = reducer {
        info!("Reducing {} embeddings with {}", points.len(), reducer.name());
        points = reducer.reduce(points)?;
    }

    Ok(hdbscan(
        &points,
        &HdbscanParams {
            min_cluster_size: config.min_cluster_size,
            min_samples: config.min_samples,
            metric: config.metric,
        },
    ))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicReport {
    pub stage: StageReport,
    pub clusters: usize,
    pub noise: usize,
}

/// Recomputes `topic_cluster_id` for every article with an embedding.
/// Outliers are written as `None`.
pub async fn group_topics(store: &dyn ArticleStorage, config: &TopicConfig) -> Result<TopicReport> {
    let articles = store.find(&ArticleFilter::with_embedding()).await?;
    if articles.is_empty() {
        info!("No articles found with embeddings.");
        return Ok(TopicReport::default());
    }
    info!("🧭 Clustering {} articles into topics", articles.len());

    let labels = cluster_topics(&articles, config)?;
    let clusters = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let noise = labels.iter().filter(|l| l.is_none()).count();

    let stage = write_updates(
        store,
        articles
            .iter()
            .zip(&labels)
            .map(|(article, label)| (article.id.clone(), vec![FieldUpdate::TopicCluster(*label)])),
    )
    .await;
    info!("✨ Updated {} articles with topic_cluster_id ({} clusters, {} noise)", stage.updated, clusters, noise);

    Ok(TopicReport { stage, clusters, noise })
}
