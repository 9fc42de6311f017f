use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/topics", get(handlers::list_topics))
        .route("/api/highlights/:topic", get(handlers::get_highlights))
        .route("/api/search", get(handlers::search))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> nh_core::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Serving highlights on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use nh_core::{Article, Error, Result, Topic};
    pub use crate::{create_app, serve, AppState};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use nh_core::{Article, ArticleStorage, FixedClock, Topic};
    use nh_inference::embeddings::EmbeddingGenerator;
    use nh_inference::models::DummyModel;
    use nh_pipeline::PipelineConfig;
    use nh_storage::InMemoryStorage;
    use serde_json::Value;
    use tower::ServiceExt;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap()
    }

    async fn app() -> Router {
        let model = Arc::new(DummyModel::new(Some(32)));
        let embedder = EmbeddingGenerator::new(model.clone());

        let mut fresh = Article::new("Cup final tonight", "", "http://test.com/1", "wire")
            .with_id("fresh")
            .with_topic(Topic::Sports)
            .with_ingested_at(Utc.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap())
            .with_embedding(embedder.generate_text_embedding("Cup final tonight").await.unwrap());
        fresh.is_featured = true;
        fresh.featured_at = Some(now());
        let old = Article::new("BREAKING: coach sacked", "", "http://test.com/2", "wire")
            .with_id("old")
            .with_topic(Topic::Sports)
            .with_ingested_at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
            .with_embedding(embedder.generate_text_embedding("Coach sacked").await.unwrap());

        let storage: Arc<dyn ArticleStorage> = Arc::new(InMemoryStorage::with_articles(vec![fresh, old]));
        let state = AppState::new(storage, embedder, PipelineConfig::default())
            .with_clock(Arc::new(FixedClock(now())));
        create_app(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_topics() {
        let (status, body) = get_json(app().await, "/api/topics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 8);
        assert_eq!(body[0], "sports");
    }

    #[tokio::test]
    async fn test_highlights_default_to_yesterday() {
        let (status, body) = get_json(app().await, "/api/highlights/sports").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["featured"].as_array().unwrap().len(), 1);
        assert_eq!(body["featured"][0]["id"], "fresh");
        assert!(body["others"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_highlights_with_since() {
        let (status, body) = get_json(app().await, "/api/highlights/Sports?since=2024-02-28").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["others"][0]["id"], "old");
    }

    #[tokio::test]
    async fn test_unknown_topic_is_bad_request() {
        let (status, body) = get_json(app().await, "/api/highlights/gardening").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("gardening"));
    }

    #[tokio::test]
    async fn test_search() {
        let (status, body) = get_json(app().await, "/api/search?q=Coach%20sacked&k=1").await;
        assert_eq!(status, StatusCode::OK);
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["article"]["id"], "old");

        let (status, _) = get_json(app().await, "/api/search?q=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
