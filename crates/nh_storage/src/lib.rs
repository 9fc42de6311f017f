use async_trait::async_trait;
use nh_core::{ArticleStorage, Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn connect(config: &BackendConfig) -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    SQLite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::SQLite),
            other => Err(Error::Storage(format!(
                "Unknown storage backend: {} (available: memory, sqlite)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn memory() -> Self {
        Self::new("memory://")
    }

    pub fn sqlite_default() -> Self {
        Self::new("sqlite://articles.db")
    }

    pub fn with_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Filesystem path of a `sqlite://` or `sqlite:` url; bare paths pass through.
    pub fn sqlite_path(&self) -> PathBuf {
        let path = self.url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))
            .unwrap_or(&self.url);
        PathBuf::from(path)
    }
}

pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    match kind.parse::<StorageKind>()? {
        StorageKind::Memory => {
            let config = BackendConfig::memory();
            let storage = InMemoryStorage::connect(&config).await?;
            info!("💾 Using in-memory article store");
            Ok(Arc::new(storage))
        }
        StorageKind::SQLite => connect_sqlite(url).await,
    }
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(url: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    let mut config = BackendConfig::sqlite_default();
    if let Some(url) = url {
        config.with_url(url);
    }
    let storage = SQLiteStorage::connect(&config).await.map_err(|e| {
        Error::Storage(format!("{} ({})", SQLiteStorage::get_error_message(), e))
    })?;
    info!("💾 Using SQLite article store at {}", config.sqlite_path().display());
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_url: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    Err(Error::Storage("SQLite support was not compiled in (enable the `sqlite` feature)".to_string()))
}

pub mod prelude {
    pub use super::{create_storage, BackendConfig, StorageBackend, StorageKind};
    pub use super::backends::*;
}
