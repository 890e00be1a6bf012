use async_trait::async_trait;
use chrono::{Duration, Utc};
use lx_core::config::BackendConfig;
use lx_core::{AuthEvent, AuthUser, Error, IdentityService, Result, Session};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Default)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            username: user.user_metadata.username,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GoTrueUser,
}

impl From<GoTrueSession> for Session {
    fn from(session: GoTrueSession) -> Self {
        Session {
            access_token: session.access_token,
            expires_at: session.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            user: session.user.into(),
        }
    }
}

/// Sign-up answers with a full session, or with the bare user when email
/// confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(GoTrueSession),
    User(GoTrueUser),
}

#[derive(Debug, Deserialize, Default)]
struct GoTrueError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueError {
    fn into_message(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.message)
    }
}

/// GoTrue-compatible auth endpoints under `{url}/auth/v1`.
pub struct SupabaseIdentity {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseIdentity {
    pub fn new(config: &BackendConfig, client: reqwest::Client) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client,
            events,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.auth_url(path)).header("apikey", &self.anon_key)
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body: GoTrueError = response.json().await.unwrap_or_default();
        body.into_message()
            .unwrap_or_else(|| format!("Authentication service responded with status {}", status.as_u16()))
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentity {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::auth("AUTH_ERROR", Self::error_message(response).await));
        }
        let user: GoTrueUser = response.json().await?;
        Ok(Some(Session {
            access_token: access_token.to_string(),
            user: user.into(),
            expires_at: None,
        }))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let status = response.status();
        if status.is_client_error() {
            let message = Self::error_message(response).await;
            debug!("Sign-in rejected ({}): {}", status, message);
            return Err(Error::auth("INVALID_CREDENTIALS", "Invalid email or password"));
        }
        if !status.is_success() {
            return Err(Error::auth("AUTH_ERROR", Self::error_message(response).await));
        }
        let session: Session = response.json::<GoTrueSession>().await?.into();
        let _ = self.events.send(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<(AuthUser, Option<Session>)> {
        let response = self
            .post("signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "username": username },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::validation("SIGNUP_ERROR", Self::error_message(response).await));
        }
        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => {
                let session: Session = session.into();
                let _ = self.events.send(AuthEvent::SignedIn(session.user.clone()));
                Ok((session.user.clone(), Some(session)))
            }
            SignUpResponse::User(user) => Ok((user.into(), None)),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self.post("logout").bearer_auth(access_token).send().await?;
        if !response.status().is_success() {
            warn!("Sign-out responded with status {}", response.status());
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<()> {
        let response = self.post("recover").json(&json!({ "email": email })).send().await?;
        if !response.status().is_success() {
            return Err(Error::validation("RESET_ERROR", Self::error_message(response).await));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
