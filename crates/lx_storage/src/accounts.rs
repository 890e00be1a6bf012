use chrono::Utc;
use lx_core::{AuthUser, Error, Filter, IdentityService, Record, RecordStore, Result, Session, UserProfile};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const PROFILES_TABLE: &str = "profiles";

/// Identity plus the `profiles` table kept alongside it. Sessions seen by
/// this process are remembered so requests keep their user while the
/// identity backend is unreachable.
pub struct Accounts {
    identity: Arc<dyn IdentityService>,
    profiles: Option<Arc<dyn RecordStore>>,
    sessions: RwLock<HashMap<String, Session>>,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: Session,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Clone)]
pub struct SignedUp {
    pub user: AuthUser,
    pub session: Option<Session>,
}

impl Accounts {
    pub fn new(identity: Arc<dyn IdentityService>, profiles: Option<Arc<dyn RecordStore>>) -> Self {
        Self {
            identity,
            profiles,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityService> {
        &self.identity
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn> {
        let session = self.identity.sign_in_with_password(email, password).await?;
        self.remember(&session).await;
        let profile = self.profile(&session.user.id).await;
        info!("🔑 Signed in {}", session.user.email);
        Ok(SignedIn { session, profile })
    }

    /// Rejects a taken email or username before creating the account, then
    /// writes the profile row. A failed profile write does not undo sign-up.
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignedUp> {
        if self.profile_exists(Filter::eq("email", email)).await {
            return Err(Error::conflict("USER_EXISTS", "User with this email already exists"));
        }
        if self.profile_exists(Filter::eq("username", username)).await {
            return Err(Error::conflict("USERNAME_TAKEN", "Username is already taken"));
        }

        let (user, session) = self.identity.sign_up(email, password, username).await?;
        if let Some(session) = &session {
            self.remember(session).await;
        }

        if let Some(profiles) = &self.profiles {
            if let Err(e) = profiles.insert(PROFILES_TABLE, profile_row(&user, email, username)).await {
                warn!("Profile creation failed for {}: {}", user.id, e);
            }
        }
        info!("🆕 Signed up {}", user.email);
        Ok(SignedUp { user, session })
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.sessions.write().await.remove(access_token);
        self.identity.sign_out(access_token).await
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        self.identity.reset_password_for_email(email).await
    }

    pub async fn session(&self, access_token: &str) -> Result<Option<SignedIn>> {
        let Some(session) = self.identity.get_session(access_token).await? else {
            self.sessions.write().await.remove(access_token);
            return Ok(None);
        };
        self.remember(&session).await;
        let profile = self.profile(&session.user.id).await;
        Ok(Some(SignedIn { session, profile }))
    }

    /// User id behind a bearer token. `Err` means the backend rejected the
    /// token. When the backend itself fails, a remembered unexpired session
    /// answers instead, and an unknown token is treated as anonymous.
    pub async fn resolve_user(&self, access_token: &str) -> Result<Option<String>> {
        match self.identity.get_session(access_token).await {
            Ok(Some(session)) => {
                self.remember(&session).await;
                Ok(Some(session.user.id))
            }
            Ok(None) => {
                self.sessions.write().await.remove(access_token);
                Err(Error::auth("UNAUTHORIZED", "Invalid or expired session"))
            }
            Err(e) => {
                let cached = self.remembered(access_token).await;
                warn!(
                    "Identity backend unavailable, continuing as {}: {}",
                    cached.as_deref().unwrap_or("anonymous"),
                    e
                );
                Ok(cached)
            }
        }
    }

    async fn remember(&self, session: &Session) {
        self.sessions
            .write()
            .await
            .insert(session.access_token.clone(), session.clone());
    }

    async fn remembered(&self, access_token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(access_token)?;
        match session.expires_at {
            Some(expires_at) if expires_at <= Utc::now() => None,
            _ => Some(session.user.id.clone()),
        }
    }

    pub async fn profile(&self, user_id: &str) -> Option<UserProfile> {
        let profiles = self.profiles.as_ref()?;
        match profiles.select(PROFILES_TABLE, &[Filter::eq("id", user_id)]).await {
            Ok(rows) => rows.into_iter().find_map(parse_profile),
            Err(e) => {
                warn!("Profile lookup failed for {}: {}", user_id, e);
                None
            }
        }
    }

    /// Lookup failures count as "not taken"; the identity backend still
    /// rejects duplicate emails itself.
    async fn profile_exists(&self, filter: Filter) -> bool {
        let Some(profiles) = &self.profiles else {
            return false;
        };
        match profiles.select(PROFILES_TABLE, &[filter]).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                warn!("Profile conflict check failed: {}", e);
                false
            }
        }
    }
}

fn profile_row(user: &AuthUser, email: &str, username: &str) -> Record {
    let mut row = Record::new();
    row.insert("id".to_string(), Value::String(user.id.clone()));
    row.insert("email".to_string(), Value::String(email.to_string()));
    row.insert("username".to_string(), Value::String(username.to_string()));
    row.insert("avatar_url".to_string(), Value::Null);
    row.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
    row
}

fn parse_profile(row: Record) -> Option<UserProfile> {
    serde_json::from_value(Value::Object(row)).ok()
}
