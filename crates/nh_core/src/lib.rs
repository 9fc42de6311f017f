pub mod models;
pub mod error;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{Classification, Clock, EmbeddingProvider, FixedClock, SystemClock, ZeroShotClassifier};
pub use storage::{ArticleFilter, ArticleStorage, FieldUpdate};
pub use types::{truncate_chars, Article, Topic};
