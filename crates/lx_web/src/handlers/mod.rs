use axum::{extract::rejection::JsonRejection, http::HeaderMap, Json};
use lx_core::{Error, Result};
use serde_json::Value;

use crate::AppState;

pub mod auth;
pub mod news;
pub mod saved;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// User id behind the bearer token. No token means anonymous; a token that
/// the identity backend rejects is an error.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<String>> {
    match bearer_token(headers) {
        Some(token) => state.accounts.resolve_user(token).await,
        None => Ok(None),
    }
}

pub(crate) fn json_body(payload: std::result::Result<Json<Value>, JsonRejection>) -> Result<Value> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| Error::validation("VALIDATION_ERROR", format!("Invalid request body: {}", e.body_text())))
}
