use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A news article and every annotation the pipeline stages attach to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub duplicate_cluster_id: Option<usize>,
    /// `None` both before topic clustering runs and for outliers.
    #[serde(default)]
    pub topic_cluster_id: Option<usize>,
    #[serde(default)]
    pub predicted_topic: Option<Topic>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub featured_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(title: impl Into<String>, text: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            text: text.into(),
            url: url.into(),
            source: source.into(),
            authors: Vec::new(),
            published_date: None,
            ingested_at: Utc::now(),
            embedding: None,
            duplicate_cluster_id: None,
            topic_cluster_id: None,
            predicted_topic: None,
            is_featured: false,
            featured_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.predicted_topic = Some(topic);
        self
    }

    pub fn with_ingested_at(mut self, ingested_at: DateTime<Utc>) -> Self {
        self.ingested_at = ingested_at;
        self
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// No title and no body, nothing worth sending to a model.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.text.trim().is_empty()
    }

    /// Title followed by body, the text keyword boosts are matched against.
    pub fn headline_text(&self) -> String {
        format!("{}{}", self.title, self.text)
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The closed topic vocabulary used for labeling and highlight categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Sports,
    Finance,
    Lifestyle,
    Music,
    Technology,
    Politics,
    Health,
    Education,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::Sports,
        Topic::Finance,
        Topic::Lifestyle,
        Topic::Music,
        Topic::Technology,
        Topic::Politics,
        Topic::Health,
        Topic::Education,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Sports => "sports",
            Topic::Finance => "finance",
            Topic::Lifestyle => "lifestyle",
            Topic::Music => "music",
            Topic::Technology => "technology",
            Topic::Politics => "politics",
            Topic::Health => "health",
            Topic::Education => "education",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Topic::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str() == wanted)
            .ok_or_else(|| crate::Error::Input(format!("Unknown topic: {}", s)))
    }
}
