use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use nh_core::{Article, ArticleStorage, Clock, Error, Result, Topic};
use nh_pipeline::config::Metric;
use nh_pipeline::{PipelineConfig, PipelineContext};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Duplicate detection, topic clustering and highlights for news articles", long_about = None)]
pub struct Cli {
    #[arg(long, default_value = "sqlite", help = "Article store. Available: memory, sqlite (default)")]
    pub storage: String,
    #[arg(long, default_value = "articles.db")]
    pub db_path: PathBuf,
    #[arg(long, default_value = "dummy", help = "Embedding model. Available: dummy (default), openai")]
    pub model: String,
    #[arg(long, help = "Model name passed to the embedding backend")]
    pub model_name: Option<String>,
    #[arg(long)]
    pub model_url: Option<String>,
    #[arg(long, env = "NH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, default_value = "keyword", help = "Zero-shot classifier. Available: keyword (default), huggingface")]
    pub classifier: String,
    #[arg(long)]
    pub classifier_url: Option<String>,
    #[arg(long, help = "Pipeline settings as JSON")]
    pub config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load articles from a JSON array file
    Import { file: PathBuf },
    /// Embed articles that have no embedding yet
    Embed,
    /// Recompute duplicate clusters
    Duplicates {
        /// Minimum cosine similarity for two articles to count as duplicates
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Recompute topic clusters
    Topics {
        #[arg(long)]
        min_cluster_size: Option<usize>,
        #[arg(long)]
        min_samples: Option<usize>,
        #[arg(long, value_parser = parse_metric)]
        metric: Option<Metric>,
        /// Reduce embeddings to this many principal components first
        #[arg(long)]
        components: Option<usize>,
    },
    /// Label articles with a topic from the vocabulary
    Label,
    /// Recompute featured articles, for one category or all of them
    Highlight {
        #[arg(long)]
        category: Option<Topic>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Run every stage in order
    Run,
    /// Show the dashboard selection for a topic
    Dashboard {
        topic: Topic,
        /// Only articles ingested on or after this day (YYYY-MM-DD, default yesterday)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Find the articles closest to a question
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

fn parse_metric(s: &str) -> std::result::Result<Metric, String> {
    match s.trim().to_lowercase().as_str() {
        "euclidean" => Ok(Metric::Euclidean),
        "cosine" => Ok(Metric::Cosine),
        other => Err(format!("Unknown metric: {} (available: euclidean, cosine)", other)),
    }
}

impl Cli {
    pub fn storage_url(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }

    /// Settings from `--config` (or defaults) with the subcommand's overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        match &self.command {
            Commands::Duplicates { threshold: Some(threshold) } => config.duplicates.threshold = *threshold,
            Commands::Topics { min_cluster_size, min_samples, metric, components } => {
                if components.is_some() {
                    config.topics.components = *components;
                }
                if let Some(size) = min_cluster_size {
                    config.topics.min_cluster_size = *size;
                }
                if let Some(samples) = min_samples {
                    config.topics.min_samples = *samples;
                }
                if let Some(metric) = metric {
                    config.topics.metric = *metric;
                }
            }
            Commands::Highlight { category, top_k } => {
                if let Some(category) = category {
                    config.highlights.categories = vec![*category];
                }
                if let Some(top_k) = top_k {
                    config.highlights.top_k = *top_k;
                }
            }
            Commands::Search { k: Some(k), .. } => config.retrieval.top_k = *k,
            _ => {}
        }
        config.validate()?;
        Ok(config)
    }
}

/// One entry of an import file. Only `title` and `url` are required.
#[derive(Debug, Deserialize)]
pub struct ArticleRecord {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub ingested_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        let mut article = Article::new(record.title, record.text, record.url, record.source);
        if let Some(id) = record.id {
            article.id = id;
        }
        if let Some(ingested_at) = record.ingested_at {
            article.ingested_at = ingested_at;
        }
        article.authors = record.authors;
        article.published_date = record.published_date;
        article.embedding = record.embedding;
        article
    }
}

pub fn read_import_file(path: &Path) -> Result<Vec<Article>> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<ArticleRecord> = serde_json::from_str(&raw)?;
    Ok(records.into_iter().map(Article::from).collect())
}

/// Runs one batch command and returns the line to print. `Serve` is handled by the caller.
pub async fn handle_command(command: &Commands, ctx: &PipelineContext) -> Result<String> {
    let store = ctx.store.as_ref();
    let summary = match command {
        Commands::Import { file } => {
            let articles = read_import_file(file)?;
            info!("📥 Importing {} articles from {}", articles.len(), file.display());
            for article in &articles {
                store.store_article(article).await?;
            }
            format!("Imported {} articles ({} stored)", articles.len(), store.count().await?)
        }
        Commands::Embed => {
            let report = ctx.embed().await?;
            format!("Embedded {} articles ({} failed)", report.updated, report.failed)
        }
        Commands::Duplicates { .. } => {
            let report = ctx.duplicates().await?;
            format!("{} duplicate clusters across {} articles", report.clusters, report.stage.updated)
        }
        Commands::Topics { .. } => {
            let report = ctx.topics().await?;
            format!("{} topic clusters, {} noise articles", report.clusters, report.noise)
        }
        Commands::Label => {
            let report = ctx.labels().await?;
            format!("Labeled {} articles ({} failed)", report.updated, report.failed)
        }
        Commands::Highlight { .. } => {
            let reports = ctx.highlights().await?;
            reports
                .iter()
                .filter_map(|r| r.category.map(|c| format!("{}: {} featured of {}", c, r.featured.len(), r.candidates)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Commands::Run => serde_json::to_string_pretty(&nh_pipeline::run_all(ctx).await?)?,
        Commands::Dashboard { topic, since } => {
            let since = nh_pipeline::since_or_yesterday(*since, ctx.clock.now())?;
            let view = nh_pipeline::dashboard(store, *topic, since, &ctx.config.dashboard).await?;
            let mut lines = vec![format!("⭐ Featured {} since {}", topic, since.date_naive())];
            lines.extend(view.featured.iter().map(|a| format!("  {} ({})", a.title, a.url)));
            lines.push("📰 Other articles".to_string());
            lines.extend(view.others.iter().map(|a| format!("  {} ({})", a.title, a.url)));
            lines.join("\n")
        }
        Commands::Search { query, .. } => {
            let results = nh_pipeline::retrieve(store, &ctx.embedder, query, ctx.config.retrieval.top_k).await?;
            results
                .iter()
                .map(|r| format!("{:.3}  {} ({})", r.score, r.article.title, r.article.url))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Commands::Serve { .. } => {
            return Err(Error::Input("serve is not a batch command".to_string()));
        }
    };
    Ok(summary)
}
