use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::Result;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Generate an embedding for a piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait ZeroShotClassifier: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Rank the candidate labels for `text` in single-label mode
    async fn classify(&self, text: &str, candidate_labels: &[String]) -> Result<Classification>;
}

/// Labels ranked by descending confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<(String, f32)>,
}

impl Classification {
    /// Builds a classification, sorting by confidence (stable on ties).
    pub fn ranked(mut labels: Vec<(String, f32)>) -> Self {
        labels.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { labels }
    }

    pub fn top(&self) -> Option<&str> {
        self.labels.first().map(|(label, _)| label.as_str())
    }
}

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
