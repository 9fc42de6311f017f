use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use nh_core::{Article, ArticleFilter, ArticleStorage, Error, FieldUpdate, Result, Topic};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::{BackendConfig, StorageBackend};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        text TEXT NOT NULL,
        url TEXT NOT NULL,
        source TEXT NOT NULL,
        authors TEXT NOT NULL,
        published_date TEXT,
        ingested_at TEXT NOT NULL,
        embedding TEXT,
        duplicate_cluster_id INTEGER,
        topic_cluster_id INTEGER,
        predicted_topic TEXT,
        is_featured INTEGER NOT NULL DEFAULT 0,
        featured_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_topic ON articles (predicted_topic)",
    "CREATE INDEX IF NOT EXISTS idx_articles_ingested_at ON articles (ingested_at)",
];

/// Fixed precision keeps lexical order identical to chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("Failed to parse date {}: {}", value, e)))
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at the configured path"
    }

    async fn connect(config: &BackendConfig) -> Result<Self> {
        Self::new_with_path(&config.sqlite_path()).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn upsert(&self, article: &Article) -> Result<()> {
        let authors = serde_json::to_string(&article.authors)?;
        let embedding = article.embedding.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, text, url, source, authors, published_date, ingested_at, embedding,
             duplicate_cluster_id, topic_cluster_id, predicted_topic, is_featured, featured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                url = excluded.url,
                source = excluded.source,
                authors = excluded.authors,
                published_date = excluded.published_date,
                ingested_at = excluded.ingested_at,
                embedding = excluded.embedding,
                duplicate_cluster_id = excluded.duplicate_cluster_id,
                topic_cluster_id = excluded.topic_cluster_id,
                predicted_topic = excluded.predicted_topic,
                is_featured = excluded.is_featured,
                featured_at = excluded.featured_at
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.text)
        .bind(&article.url)
        .bind(&article.source)
        .bind(authors)
        .bind(article.published_date.map(format_timestamp))
        .bind(format_timestamp(article.ingested_at))
        .bind(embedding)
        .bind(article.duplicate_cluster_id.map(|id| id as i64))
        .bind(article.topic_cluster_id.map(|id| id as i64))
        .bind(article.predicted_topic.map(|topic| topic.as_str()))
        .bind(article.is_featured)
        .bind(article.featured_at.map(format_timestamp))
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Persistence(format!("Failed to store article {}: {}", article.id, e)))?;

        Ok(())
    }
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let authors: String = row.get("authors");
    let embedding: Option<String> = row.get("embedding");
    let published_date: Option<String> = row.get("published_date");
    let featured_at: Option<String> = row.get("featured_at");
    let predicted_topic: Option<String> = row.get("predicted_topic");

    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        url: row.get("url"),
        source: row.get("source"),
        authors: serde_json::from_str(&authors)?,
        published_date: published_date.as_deref().map(parse_timestamp).transpose()?,
        ingested_at: parse_timestamp(&row.get::<String, _>("ingested_at"))?,
        embedding: embedding.as_deref().map(serde_json::from_str).transpose()?,
        duplicate_cluster_id: row.get::<Option<i64>, _>("duplicate_cluster_id").map(|id| id as usize),
        topic_cluster_id: row.get::<Option<i64>, _>("topic_cluster_id").map(|id| id as usize),
        predicted_topic: predicted_topic.as_deref().map(str::parse::<Topic>).transpose()?,
        is_featured: row.get("is_featured"),
        featured_at: featured_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        self.upsert(article).await
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to get article {}: {}", id, e)))?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn find(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM articles WHERE 1 = 1");
        if let Some(has_embedding) = filter.has_embedding {
            query.push(if has_embedding {
                " AND embedding IS NOT NULL"
            } else {
                " AND embedding IS NULL"
            });
        }
        if let Some(topic) = filter.predicted_topic {
            query.push(" AND predicted_topic = ").push_bind(topic.as_str());
        }
        if let Some(since) = filter.ingested_since {
            query.push(" AND ingested_at >= ").push_bind(format_timestamp(since));
        }
        if let Some(is_featured) = filter.is_featured {
            query.push(" AND is_featured = ").push_bind(is_featured);
        }
        query.push(" ORDER BY rowid");

        let rows = query
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to find articles: {}", e)))?;

        rows.iter().map(article_from_row).collect()
    }

    async fn update_by_id(&self, id: &str, updates: &[FieldUpdate]) -> Result<()> {
        let mut article = self
            .get_article(id)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?
            .ok_or_else(|| Error::Persistence(format!("Article not found: {}", id)))?;
        for update in updates {
            update.apply(&mut article);
        }
        self.upsert(&article).await
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to count articles: {}", e)))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn article(id: &str, day: u32) -> Article {
        Article::new("Test Article", "Test content", "http://example.com", "test")
            .with_id(id)
            .with_ingested_at(Utc.with_ymd_and_hms(2025, 3, day, 9, 30, 0).unwrap())
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();

        let mut stored = article("a1", 21).with_embedding(vec![0.1, 0.2, 0.3]).with_topic(Topic::Finance);
        stored.authors = vec!["Test Author".to_string()];
        storage.store_article(&stored).await.unwrap();
        storage.store_article(&article("a2", 22)).await.unwrap();

        assert_eq!(storage.count().await.unwrap(), 2);
        let loaded = storage.get_article("a1").await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(storage.get_article("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_filters() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db")).await.unwrap();

        storage.store_article(&article("a1", 20).with_topic(Topic::Sports).with_embedding(vec![1.0])).await.unwrap();
        storage.store_article(&article("a2", 22).with_topic(Topic::Sports)).await.unwrap();
        storage.store_article(&article("a3", 22).with_topic(Topic::Music).with_embedding(vec![1.0])).await.unwrap();

        let embedded = storage.find(&ArticleFilter::with_embedding()).await.unwrap();
        assert_eq!(embedded.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a1", "a3"]);

        let since = Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap();
        let recent_sports = storage.find(&ArticleFilter::all().topic(Topic::Sports).since(since)).await.unwrap();
        assert_eq!(recent_sports.len(), 1);
        assert_eq!(recent_sports[0].id, "a2");

        assert_eq!(storage.find(&ArticleFilter::all().featured(true)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_update_by_id() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db")).await.unwrap();
        storage.store_article(&article("a1", 20)).await.unwrap();
        storage.store_article(&article("a2", 21)).await.unwrap();

        let featured_at = Utc.with_ymd_and_hms(2025, 3, 22, 12, 0, 0).unwrap();
        storage
            .update_by_id("a1", &[
                FieldUpdate::TopicCluster(Some(4)),
                FieldUpdate::Featured { is_featured: true, featured_at: Some(featured_at) },
            ])
            .await
            .unwrap();

        let loaded = storage.get_article("a1").await.unwrap().unwrap();
        assert_eq!(loaded.topic_cluster_id, Some(4));
        assert!(loaded.is_featured);
        assert_eq!(loaded.featured_at, Some(featured_at));

        // Updating keeps the original insertion order
        let all = storage.find(&ArticleFilter::all()).await.unwrap();
        assert_eq!(all[0].id, "a1");

        let missing = storage.update_by_id("missing", &[FieldUpdate::DuplicateCluster(1)]).await;
        assert!(matches!(missing, Err(Error::Persistence(_))));
    }
}
