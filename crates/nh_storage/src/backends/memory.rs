use async_trait::async_trait;
use nh_core::{Article, ArticleFilter, ArticleStorage, Error, FieldUpdate, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
}

impl MemoryStore {
    pub fn store_article(&mut self, article: &Article) {
        if let Some(existing) = self.articles.iter_mut().find(|a| a.id == article.id) {
            *existing = article.clone();
        } else {
            self.articles.push(article.clone());
        }
    }

    pub fn get_article(&self, id: &str) -> Option<Article> {
        self.articles.iter().find(|a| a.id == id).cloned()
    }

    pub fn find(&self, filter: &ArticleFilter) -> Vec<Article> {
        self.articles
            .iter()
            .filter(|article| filter.matches(article))
            .cloned()
            .collect()
    }

    pub fn update_by_id(&mut self, id: &str, updates: &[FieldUpdate]) -> Result<()> {
        let article = self.articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::Persistence(format!("Article not found: {}", id)))?;
        for update in updates {
            update.apply(article);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        let mut store = MemoryStore::default();
        for article in &articles {
            store.store_article(article);
        }
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn connect(_config: &BackendConfig) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        self.store.write().await.store_article(article);
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.store.read().await.get_article(id))
    }

    async fn find(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        Ok(self.store.read().await.find(filter))
    }

    async fn update_by_id(&self, id: &str, updates: &[FieldUpdate]) -> Result<()> {
        self.store.write().await.update_by_id(id, updates)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.store.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use nh_core::Topic;

    fn article(id: &str) -> Article {
        Article::new("Test Article", "This is a test article about politics.", "http://test.com", "test")
            .with_id(id)
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = InMemoryStorage::new();
        storage.store_article(&article("a1")).await.unwrap();
        storage.store_article(&article("a2").with_embedding(vec![0.1, 0.2])).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 2);
        let embedded = storage.find(&ArticleFilter::with_embedding()).await.unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(embedded[0].id, "a2");

        let missing = storage.find(&ArticleFilter::without_embedding()).await.unwrap();
        assert_eq!(missing[0].id, "a1");
    }

    #[tokio::test]
    async fn test_store_replaces_by_id() {
        let storage = InMemoryStorage::new();
        storage.store_article(&article("a1")).await.unwrap();
        let mut updated = article("a1");
        updated.title = "Updated".to_string();
        storage.store_article(&updated).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 1);
        assert_eq!(storage.get_article("a1").await.unwrap().unwrap().title, "Updated");
    }

    #[tokio::test]
    async fn test_update_by_id() {
        let storage = InMemoryStorage::with_articles(vec![article("a1")]);
        storage
            .update_by_id("a1", &[FieldUpdate::PredictedTopic(Topic::Sports), FieldUpdate::DuplicateCluster(2)])
            .await
            .unwrap();

        let stored = storage.get_article("a1").await.unwrap().unwrap();
        assert_eq!(stored.predicted_topic, Some(Topic::Sports));
        assert_eq!(stored.duplicate_cluster_id, Some(2));

        let result = storage.update_by_id("missing", &[FieldUpdate::DuplicateCluster(0)]).await;
        assert!(matches!(result, Err(Error::Persistence(_))));
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let now = Utc::now();
        let old = article("old").with_topic(Topic::Sports).with_ingested_at(now - Duration::days(3));
        let fresh = article("fresh").with_topic(Topic::Sports).with_ingested_at(now);
        let other = article("other").with_topic(Topic::Music).with_ingested_at(now);
        let storage = InMemoryStorage::with_articles(vec![old, fresh, other]);

        let found = storage
            .find(&ArticleFilter::all().topic(Topic::Sports).since(now - Duration::days(1)))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "fresh");
    }
}
