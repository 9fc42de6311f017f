use nh_core::{Article, ArticleFilter, ArticleStorage, Error, Result};
use nh_inference::embeddings::EmbeddingGenerator;
use serde::Serialize;
use tracing::info;
use crate::similarity::cosine_similarity;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub score: f64,
}

/// Ranks `articles` against `query` by cosine similarity, best first. Equal
/// scores keep store order.
pub fn rank_by_similarity(query: &[f32], articles: Vec<Article>, top_k: usize) -> Result<Vec<ScoredArticle>> {
    let mut scored = Vec::with_capacity(articles.len());
    for article in articles {
        let score = match article.embedding.as_deref() {
            Some(embedding) if embedding.len() == query.len() => cosine_similarity(query, embedding),
            Some(embedding) => {
                return Err(Error::Input(format!(
                    "Article {} has {} components, query has {}",
                    article.id,
                    embedding.len(),
                    query.len()
                )))
            }
            None => continue,
        };
        scored.push(ScoredArticle { article, score });
    }
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    Ok(scored)
}

/// Source articles for a chat question.
pub async fn retrieve(
    store: &dyn ArticleStorage,
    generator: &EmbeddingGenerator,
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredArticle>> {
    let query_embedding = generator.generate_text_embedding(query).await?;
    if query_embedding.is_empty() {
        return Err(Error::Collaborator("Query embedding is empty".to_string()));
    }
    let articles = store.find(&ArticleFilter::with_embedding()).await?;
    let results = rank_by_similarity(&query_embedding, articles, top_k)?;
    info!("🔎 Retrieved {} articles for query", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nh_core::EmbeddingProvider;
    use nh_inference::models::DummyModel;
    use nh_storage::InMemoryStorage;
    use std::sync::Arc;

    #[test]
    fn test_rank_by_similarity() {
        let articles = vec![
            Article::new("a", "", "u", "s").with_id("a").with_embedding(vec![0.0, 1.0]),
            Article::new("b", "", "u", "s").with_id("b").with_embedding(vec![1.0, 0.0]),
            Article::new("c", "", "u", "s").with_id("c").with_embedding(vec![1.0, 1.0]),
            Article::new("d", "", "u", "s").with_id("d"),
        ];
        let ranked = rank_by_similarity(&[1.0, 0.0], articles, 2).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|s| s.article.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch_is_input_error() {
        let articles = vec![Article::new("a", "", "u", "s").with_embedding(vec![1.0, 0.0, 0.0])];
        assert!(matches!(rank_by_similarity(&[1.0, 0.0], articles, 5), Err(Error::Input(_))));
    }

    #[tokio::test]
    async fn test_retrieve_puts_identical_text_first() {
        let model = Arc::new(DummyModel::new(Some(64)));
        let texts = [
            ("r1", "Central bank raises interest rates"),
            ("r2", "Local team wins the championship"),
            ("r3", "New phone released with better camera"),
        ];
        let mut articles = Vec::new();
        for (id, title) in texts {
            let embedding = model.embed(title).await.unwrap();
            articles.push(Article::new(title, "", format!("http://test.com/{}", id), "test").with_id(id).with_embedding(embedding));
        }
        let store = InMemoryStorage::with_articles(articles);
        let generator = EmbeddingGenerator::new(model);

        let results = retrieve(&store, &generator, "Local team wins the championship", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].article.id, "r2");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }
}
