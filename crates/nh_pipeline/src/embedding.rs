use nh_core::{ArticleFilter, ArticleStorage, FieldUpdate, Result};
use nh_inference::embeddings::EmbeddingGenerator;
use tracing::{debug, info, warn};
use crate::report::{write_updates, StageReport};

/// Embeds every article that has no embedding yet. Provider failures and empty
/// vectors skip the article and count as failed, blank articles are skipped
/// without a provider call. Errors that are not per-item abort the stage.
pub async fn embed_missing(store: &dyn ArticleStorage, generator: &EmbeddingGenerator) -> Result<StageReport> {
    let articles = store.find(&ArticleFilter::without_embedding()).await?;
    if articles.is_empty() {
        info!("No articles waiting for embeddings.");
        return Ok(StageReport::default());
    }
    info!("🧮 Generating embeddings for {} articles with {}", articles.len(), generator.model_name());

    let mut updates = Vec::with_capacity(articles.len());
    let mut failed = 0;
    let mut skipped = 0;
    for article in &articles {
        if article.is_blank() {
            debug!("Article {} has no text, not embedding", article.id);
            skipped += 1;
            continue;
        }
        match generator.generate_article_embedding(article).await {
            Ok(embedding) if embedding.is_empty() => {
                warn!("⚠️ Empty embedding for article {}", article.id);
                failed += 1;
            }
            Ok(embedding) => {
                debug!("Embedded article {} ({} dims)", article.id, embedding.len());
                updates.push((article.id.clone(), vec![FieldUpdate::Embedding(embedding)]));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("⚠️ Failed to embed article {}: {}", article.id, e);
                failed += 1;
            }
        }
    }

    let mut report = write_updates(store, updates).await;
    report.processed += failed + skipped;
    report.failed += failed;
    report.skipped = skipped;
    info!("✨ Stored {} embeddings ({} failed, {} skipped)", report.updated, report.failed, report.skipped);
    Ok(report)
}
