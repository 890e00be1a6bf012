use async_trait::async_trait;
use chrono::{Duration, Utc};
use lx_core::{AuthEvent, AuthUser, Error, IdentityService, Result, Session};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const SESSION_HOURS: i64 = 1;

struct Account {
    user: AuthUser,
    password_hash: String,
}

/// Process-local accounts with salted SHA-256 password hashes. Used for
/// development and tests.
pub struct MemoryIdentity {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, Session>>,
    events: broadcast::Sender<AuthEvent>,
}

fn hash_password(user_id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    async fn open_session(&self, user: AuthUser) -> Session {
        let session = Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            user: user.clone(),
            expires_at: Some(Utc::now() + Duration::hours(SESSION_HOURS)),
        };
        self.sessions
            .write()
            .await
            .insert(session.access_token.clone(), session.clone());
        // No receivers is fine
        let _ = self.events.send(AuthEvent::SignedIn(user));
        session
    }
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_session(&self, access_token: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(access_token)
            .filter(|s| s.expires_at.map_or(true, |at| at > Utc::now()))
            .cloned())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let user = {
            let accounts = self.accounts.read().await;
            accounts
                .get(&email.to_lowercase())
                .filter(|a| a.password_hash == hash_password(&a.user.id, password))
                .map(|a| a.user.clone())
        };
        match user {
            Some(user) => Ok(self.open_session(user).await),
            None => Err(Error::auth("INVALID_CREDENTIALS", "Invalid email or password")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<(AuthUser, Option<Session>)> {
        let email = email.to_lowercase();
        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(Error::conflict("USER_EXISTS", "User with this email already exists"));
            }
            let user = AuthUser {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.clone(),
                username: Some(username.to_string()),
            };
            accounts.insert(
                email,
                Account {
                    password_hash: hash_password(&user.id, password),
                    user: user.clone(),
                },
            );
            user
        };
        let session = self.open_session(user.clone()).await;
        Ok((user, Some(session)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        if self.sessions.write().await.remove(access_token).is_some() {
            let _ = self.events.send(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<()> {
        // Nothing is sent; unknown addresses are not revealed either way.
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
