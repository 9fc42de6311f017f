use std::sync::Arc;
use nh_core::{ArticleStorage, Clock, SystemClock};
use nh_inference::embeddings::EmbeddingGenerator;
use nh_pipeline::PipelineConfig;

pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
    pub embedder: EmbeddingGenerator,
    pub config: PipelineConfig,
    /// Supplies "today" for the default recency cutoff.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(storage: Arc<dyn ArticleStorage>, embedder: EmbeddingGenerator, config: PipelineConfig) -> Self {
        Self {
            storage,
            embedder,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
