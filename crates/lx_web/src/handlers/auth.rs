use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use lx_core::{AuthUser, Error, Session, UserProfile};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{bearer_token, json_body};
use crate::response::{ok, ApiResult};
use crate::validation::{self, required_str};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: AuthUser,
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let body = json_body(payload)?;
    let email = validation::email(required_str(&body, "email")?)?;
    let password = validation::password(required_str(&body, "password")?)?;

    let signed_in = state.accounts.sign_in(&email, password).await?;
    ok(AuthPayload {
        user: signed_in.session.user.clone(),
        session: Some(signed_in.session),
        profile: signed_in.profile,
        message: Some("Successfully signed in"),
    })
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AuthPayload> {
    let body = json_body(payload)?;
    let email = validation::email(required_str(&body, "email")?)?;
    let password = validation::password(required_str(&body, "password")?)?;
    let username = validation::username(required_str(&body, "username")?)?;

    let signed_up = state.accounts.sign_up(&email, password, &username).await?;
    let profile = state.accounts.profile(&signed_up.user.id).await;
    ok(AuthPayload {
        user: signed_up.user,
        session: signed_up.session,
        profile,
        message: Some("Account created successfully"),
    })
}

pub async fn sign_out(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Message> {
    if let Some(token) = bearer_token(&headers) {
        state.accounts.sign_out(token).await?;
    }
    ok(Message {
        message: "Successfully signed out",
    })
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Message> {
    let body = json_body(payload)?;
    let email = validation::email(required_str(&body, "email")?)?;
    state.accounts.reset_password(&email).await?;
    ok(Message {
        message: "Password reset email sent",
    })
}

pub async fn session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<AuthPayload> {
    let token = bearer_token(&headers).ok_or_else(|| Error::auth("UNAUTHORIZED", "No active session"))?;
    let signed_in = state
        .accounts
        .session(token)
        .await?
        .ok_or_else(|| Error::auth("UNAUTHORIZED", "Invalid or expired session"))?;
    ok(AuthPayload {
        user: signed_in.session.user.clone(),
        session: Some(signed_in.session),
        profile: signed_in.profile,
        message: None,
    })
}
