use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use lx_core::{Article, Error, SavedArticle};
use lx_storage::SaveOutcome;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{current_user, json_body};
use crate::response::{ok, ApiResult};
use crate::validation::required_str;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SavedList {
    pub articles: Vec<SavedArticle>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub outcome: SaveOutcome,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RemoveResult {
    pub message: &'static str,
}

pub async fn list(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<SavedList> {
    let user = current_user(&state, &headers).await?;
    let articles = state.saved.get(user.as_deref()).await;
    ok(SavedList {
        total: articles.len(),
        articles,
    })
}

pub async fn save(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<SaveResult> {
    let user = current_user(&state, &headers).await?;
    let mut body = json_body(payload)?;
    let raw = body
        .get_mut("article")
        .map(Value::take)
        .ok_or_else(|| Error::validation("VALIDATION_ERROR", "Missing or invalid required field: article"))?;
    let article: Article =
        serde_json::from_value(raw).map_err(|_| Error::validation("INVALID_ARTICLE", "Invalid article data"))?;

    let outcome = state.saved.save(article, user.as_deref()).await?;
    let message = match outcome {
        SaveOutcome::Saved => "Article saved successfully",
        SaveOutcome::AlreadySaved => "Article already saved",
    };
    ok(SaveResult { outcome, message })
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RemoveResult> {
    let user = current_user(&state, &headers).await?;
    let body = json_body(payload)?;
    let article_id = required_str(&body, "articleId")?;
    state.saved.remove(article_id, user.as_deref()).await;
    ok(RemoveResult {
        message: "Article removed successfully",
    })
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<SavedArticle> {
    let user = current_user(&state, &headers).await?;
    match state.saved.get_by_id(&id, user.as_deref()).await {
        Some(saved) => ok(saved),
        None => Err(Error::NotFound(format!("saved article {}", id)).into()),
    }
}
