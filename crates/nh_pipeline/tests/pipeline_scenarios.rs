use std::sync::Arc;
use chrono::{TimeZone, Utc};
use nh_core::{Article, ArticleFilter, ArticleStorage, Clock, Error, FixedClock, Topic};
use nh_inference::embeddings::EmbeddingGenerator;
use nh_inference::models::DummyModel;
use nh_inference::zero_shot::KeywordClassifier;
use nh_pipeline::prelude::*;
use nh_pipeline::{dashboard, featured_articles};
use nh_storage::{create_storage, InMemoryStorage};

fn news() -> Vec<Article> {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    vec![
        Article::new("Team wins cup final", "The team won the league cup match.", "http://test.com/s1", "wire")
            .with_id("s1")
            .with_ingested_at(at),
        Article::new("Team wins cup final", "The team won the league cup match.", "http://mirror.com/s1", "mirror")
            .with_id("s2")
            .with_ingested_at(at),
        Article::new("Bank raises interest rates", "Markets react as the bank lifts rates.", "http://test.com/f1", "wire")
            .with_id("f1")
            .with_ingested_at(at),
        Article::new("BREAKING: stock market falls", "Investors sell shares as the market drops.", "http://test.com/f2", "wire")
            .with_id("f2")
            .with_ingested_at(at),
    ]
}

fn context(store: Arc<dyn ArticleStorage>) -> PipelineContext {
    PipelineContext {
        store,
        embedder: EmbeddingGenerator::new(Arc::new(DummyModel::new(None))),
        classifier: Arc::new(KeywordClassifier::new()),
        clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())),
        config: PipelineConfig::default(),
    }
}

async fn get(store: &dyn ArticleStorage, id: &str) -> Article {
    store.get_article(id).await.unwrap().unwrap()
}

async fn check_full_run(store: Arc<dyn ArticleStorage>) {
    for article in news() {
        store.store_article(&article).await.unwrap();
    }
    let ctx = context(store.clone());

    let report = run_all(&ctx).await.unwrap();
    assert_eq!(report.embeddings.updated, 4);
    assert_eq!(report.topics.stage.updated, 4);
    assert_eq!(report.labels.updated, 4);

    let s1 = get(store.as_ref(), "s1").await;
    let s2 = get(store.as_ref(), "s2").await;
    let f1 = get(store.as_ref(), "f1").await;
    assert_eq!(s1.duplicate_cluster_id, s2.duplicate_cluster_id);
    assert_ne!(s1.duplicate_cluster_id, f1.duplicate_cluster_id);
    assert_eq!(s1.predicted_topic, Some(Topic::Sports));
    assert_eq!(f1.predicted_topic, Some(Topic::Finance));
    assert!(s1.is_featured && s2.is_featured && f1.is_featured);
    assert_eq!(s1.featured_at, Some(ctx.clock.now()));

    let finance = report
        .highlights
        .iter()
        .find(|h| h.category == Some(Topic::Finance))
        .unwrap();
    assert_eq!(finance.featured, vec!["f2".to_string(), "f1".to_string()]);

    // Nothing changed, so a second run selects the same articles.
    let again = run_all(&ctx).await.unwrap();
    assert_eq!(again.embeddings.processed, 0);
    let finance_again = again
        .highlights
        .iter()
        .find(|h| h.category == Some(Topic::Finance))
        .unwrap();
    assert_eq!(finance_again.featured, finance.featured);

    let since = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
    let view = dashboard(store.as_ref(), Topic::Finance, since, &ctx.config.dashboard).await.unwrap();
    assert_eq!(view.featured.len(), 2);
    assert!(view.others.is_empty());
}

#[tokio::test]
async fn test_full_run_in_memory() {
    check_full_run(Arc::new(InMemoryStorage::new())).await;
}

#[tokio::test]
async fn test_full_run_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("news.db").display());
    let store = create_storage("sqlite", Some(&url)).await.unwrap();
    check_full_run(store).await;
}

#[tokio::test]
async fn test_input_error_stops_the_run() {
    let mut articles = news();
    articles.push(
        Article::new("Odd one", "", "http://test.com/odd", "wire")
            .with_id("odd")
            .with_embedding(vec![1.0, 0.0]),
    );
    let store: Arc<dyn ArticleStorage> = Arc::new(InMemoryStorage::with_articles(articles));
    let ctx = context(store.clone());

    let result = run_all(&ctx).await;
    assert!(matches!(result, Err(Error::Input(_))));

    // Embeddings were written before the failing stage, labels never ran.
    let s1 = get(store.as_ref(), "s1").await;
    assert!(s1.has_embedding());
    assert_eq!(s1.predicted_topic, None);
    assert_eq!(s1.duplicate_cluster_id, None);
}

#[tokio::test]
async fn test_recency_cutoff_hides_old_features() {
    let store: Arc<dyn ArticleStorage> = Arc::new(InMemoryStorage::with_articles(news()));
    let ctx = context(store.clone());
    run_all(&ctx).await.unwrap();

    let after = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
    let featured = featured_articles(store.as_ref(), Topic::Sports, after, &ctx.config.dashboard)
        .await
        .unwrap();
    assert!(featured.is_empty());
    assert_eq!(store.find(&ArticleFilter::all().featured(true)).await.unwrap().len(), 4);
}
