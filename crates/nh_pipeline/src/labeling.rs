use nh_core::{truncate_chars, Article, ArticleFilter, ArticleStorage, Error, FieldUpdate, Result, Topic, ZeroShotClassifier};
use tracing::{debug, info, warn};
use crate::config::LabelConfig;
use crate::report::{write_updates, StageReport};

/// Classifier input for one article: title and body on separate lines, cut to `max_chars`.
pub fn classifier_input(article: &Article, max_chars: usize) -> String {
    let full = format!("{}\n{}", article.title, article.text);
    truncate_chars(&full, max_chars).to_string()
}

/// Highest-ranked label for `article`, parsed into the vocabulary.
pub async fn predict_topic(
    classifier: &dyn ZeroShotClassifier,
    article: &Article,
    config: &LabelConfig,
) -> Result<Topic> {
    let candidates: Vec<String> = config.candidate_labels.iter().map(|t| t.to_string()).collect();
    let classification = classifier
        .classify(&classifier_input(article, config.max_chars), &candidates)
        .await?;
    let top = classification
        .top()
        .ok_or_else(|| Error::Collaborator("Classifier returned no labels".to_string()))?;
    top.parse::<Topic>()
        .map_err(|_| Error::Collaborator(format!("Classifier returned unknown label '{}'", top)))
}

/// Writes `predicted_topic` for every article with an embedding. Articles the
/// classifier fails on keep whatever topic they had and are counted as failed.
/// Blank articles are skipped.
pub async fn label_topics(
    store: &dyn ArticleStorage,
    classifier: &dyn ZeroShotClassifier,
    config: &LabelConfig,
) -> Result<StageReport> {
    let articles = store.find(&ArticleFilter::with_embedding()).await?;
    if articles.is_empty() {
        info!("No articles found with embeddings.");
        return Ok(StageReport::default());
    }
    info!("🏷️ Labeling {} articles with {}", articles.len(), classifier.name());

    let mut updates = Vec::with_capacity(articles.len());
    let mut failed = 0;
    let mut skipped = 0;
    for article in &articles {
        if article.is_blank() {
            debug!("Article {} has no text, not labeling", article.id);
            skipped += 1;
            continue;
        }
        match predict_topic(classifier, article, config).await {
            Ok(topic) => {
                debug!("Article {} -> {}", article.id, topic);
                updates.push((article.id.clone(), vec![FieldUpdate::PredictedTopic(topic)]));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("⚠️ Skipping article {}: {}", article.id, e);
                failed += 1;
            }
        }
    }

    let mut report = write_updates(store, updates).await;
    report.processed += failed + skipped;
    report.failed += failed;
    report.skipped = skipped;
    info!("✨ Labeled {} articles ({} failed, {} skipped)", report.updated, report.failed, report.skipped);
    Ok(report)
}
