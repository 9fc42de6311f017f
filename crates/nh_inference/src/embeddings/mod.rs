use std::sync::Arc;
use nh_core::{truncate_chars, Article, EmbeddingProvider, Result};

/// Longest input the embedding collaborators accept, in characters.
pub const DEFAULT_MAX_CHARS: usize = 8191;

pub struct EmbeddingGenerator {
    model: Arc<dyn EmbeddingProvider>,
    max_chars: usize,
}

impl EmbeddingGenerator {
    pub fn new(model: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            model,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Title and body joined by a space, truncated to the input limit.
    pub fn article_input(&self, article: &Article) -> String {
        let combined = format!("{} {}", article.title, article.text);
        truncate_chars(&combined, self.max_chars).to_string()
    }

    pub async fn generate_article_embedding(&self, article: &Article) -> Result<Vec<f32>> {
        self.model.embed(&self.article_input(article)).await
    }

    pub async fn generate_text_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.model.embed(truncate_chars(text, self.max_chars)).await
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}
