use clap::Parser;
use nh_core::{ArticleStorage, Result, SystemClock};
use nh_inference::embeddings::EmbeddingGenerator;
use nh_inference::Config;
use nh_pipeline::PipelineContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod cli;
mod logging;

use cli::{handle_command, Cli, Commands};

async fn check_storage(storage: &Arc<dyn ArticleStorage>, storage_type: &str) -> Result<()> {
    let count = storage.count().await?;
    info!("🏦 Storage backend initialized successfully (using {}, {} articles)", storage_type, count);
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn ArticleStorage>,
    storage_type: &str,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage, storage_type)).await {
            Ok(result) => return result,
            Err(timeout_error) => {
                last_error = Some(nh_core::Error::Storage(format!("Storage health check timed out: {}", timeout_error)));
                retries += 1;
                if retries < max_retries {
                    info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| nh_core::Error::Storage("Storage health check failed after all retries".to_string())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = cli.pipeline_config()?;

    let storage = nh_storage::create_storage(&cli.storage, Some(&cli.storage_url())).await?;
    info!("💾 Checking storage connection...");
    check_storage_with_retry(&storage, &cli.storage, 3, Duration::from_secs(10)).await?;

    let embedder_config = Config {
        api_key: cli.api_key.clone(),
        model_name: cli.model_name.clone(),
        model_url: cli.model_url.clone(),
    };
    let embedder = nh_inference::create_embedder(&cli.model, embedder_config).await?;

    let classifier_config = Config {
        api_key: cli.api_key.clone(),
        model_name: None,
        model_url: cli.classifier_url.clone(),
    };
    let classifier = nh_inference::create_classifier(&cli.classifier, classifier_config).await?;

    let embedder = EmbeddingGenerator::new(embedder).with_max_chars(config.embedding.max_chars);

    if let Commands::Serve { addr } = cli.command {
        let state = nh_web::AppState::new(storage, embedder, config);
        return nh_web::serve(state, addr).await;
    }

    let ctx = PipelineContext {
        store: storage,
        embedder,
        classifier,
        clock: Arc::new(SystemClock),
        config,
    };
    let summary = handle_command(&cli.command, &ctx).await?;
    println!("{}", summary);

    Ok(())
}
