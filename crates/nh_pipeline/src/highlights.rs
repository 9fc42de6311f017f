use nh_core::{Article, ArticleFilter, ArticleStorage, Clock, Error, FieldUpdate, Result, Topic};
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::config::HighlightConfig;
use crate::report::write_updates;
use crate::similarity::{cosine_similarity_matrix, embeddings_of};

pub fn has_keyword(text: &str, keywords: &[String]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
}

/// Echo count plus keyword boost for every article, in input order.
pub fn highlight_scores(articles: &[Article], config: &HighlightConfig) -> Result<Vec<usize>> {
    if articles.is_empty() {
        return Ok(Vec::new());
    }
    let matrix = cosine_similarity_matrix(&embeddings_of(articles)?)?;
    Ok(articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            let echo = matrix.count_above(i, config.similarity_threshold);
            let boost = if has_keyword(&article.headline_text(), &config.keywords) {
                config.keyword_boost
            } else {
                0
            };
            echo + boost
        })
        .collect())
}

/// Indices of the `top_k` best scores, highest first. Equal scores keep input order.
pub fn select_top(scores: &[usize], top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|a, b| scores[*b].cmp(&scores[*a]));
    order.truncate(top_k);
    order
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HighlightReport {
    pub category: Option<Topic>,
    pub candidates: usize,
    pub featured: Vec<String>,
    pub reset: usize,
    /// Articles in the category without an embedding.
    pub skipped: usize,
    pub failed: usize,
    /// Set when the category's batch was rejected, e.g. mixed embedding dimensions.
    pub error: Option<String>,
}

/// Recomputes the featured set of one category: reset, score, select, persist.
pub async fn update_featured_highlights(
    store: &dyn ArticleStorage,
    category: Topic,
    config: &HighlightConfig,
    clock: &dyn Clock,
) -> Result<HighlightReport> {
    let mut report = HighlightReport {
        category: Some(category),
        ..HighlightReport::default()
    };

    let in_category = store.find(&ArticleFilter::all().topic(category)).await?;
    if in_category.is_empty() {
        debug!("No articles in category {}", category);
        return Ok(report);
    }

    let cleared = write_updates(
        store,
        in_category.iter().map(|article| {
            (article.id.clone(), vec![FieldUpdate::Featured { is_featured: false, featured_at: None }])
        }),
    )
    .await;
    report.reset = cleared.updated;
    report.failed += cleared.failed;

    let (candidates, bare): (Vec<Article>, Vec<Article>) = in_category.into_iter().partition(Article::has_embedding);
    report.candidates = candidates.len();
    report.skipped = bare.len();
    if candidates.is_empty() {
        info!("No embedded articles in category {}", category);
        return Ok(report);
    }

    let scores = highlight_scores(&candidates, config)?;
    let winners = select_top(&scores, config.top_k);
    for &i in &winners {
        debug!("{} scored {} in {}", candidates[i].id, scores[i], category);
    }

    let now = clock.now();
    let persisted = write_updates(
        store,
        winners.iter().map(|&i| {
            (candidates[i].id.clone(), vec![FieldUpdate::Featured { is_featured: true, featured_at: Some(now) }])
        }),
    )
    .await;
    report.failed += persisted.failed;
    report.featured = winners.iter().map(|&i| candidates[i].id.clone()).collect();

    info!("⭐ Featured {} of {} articles in {}", report.featured.len(), report.candidates, category);
    Ok(report)
}

/// Runs every configured category in turn. A rejected batch only fails its own
/// category; store outages still abort the run.
pub async fn run_highlights(
    store: &dyn ArticleStorage,
    config: &HighlightConfig,
    clock: &dyn Clock,
) -> Result<Vec<HighlightReport>> {
    let mut reports = Vec::with_capacity(config.categories.len());
    for &category in &config.categories {
        match update_featured_highlights(store, category, config, clock).await {
            Ok(report) => reports.push(report),
            Err(e @ Error::Input(_)) => {
                warn!("⚠️ Skipping highlights for {}: {}", category, e);
                reports.push(HighlightReport {
                    category: Some(category),
                    failed: 1,
                    error: Some(e.to_string()),
                    ..HighlightReport::default()
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(reports)
}
