use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use nh_core::{Clock, Topic};
use nh_pipeline::{dashboard, retrieve, since_or_yesterday, DashboardView, ScoredArticle};
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HighlightQuery {
    /// Only articles ingested on or after this day.
    pub since: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub k: Option<usize>,
}

pub async fn list_topics() -> Json<Vec<Topic>> {
    Json(Topic::ALL.to_vec())
}

pub async fn get_highlights(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(query): Query<HighlightQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let topic: Topic = topic.parse()?;
    let since = since_or_yesterday(query.since, state.clock.now())?;
    let view = dashboard(state.storage.as_ref(), topic, since, &state.config.dashboard).await?;
    Ok(Json(view))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ScoredArticle>>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    let top_k = query.k.unwrap_or(state.config.retrieval.top_k);
    let results = retrieve(state.storage.as_ref(), &state.embedder, &query.q, top_k).await?;
    Ok(Json(results))
}
