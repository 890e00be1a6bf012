use async_trait::async_trait;
use tokio::sync::broadcast;
use crate::types::{AuthEvent, AuthUser, Session};
use crate::Result;

#[async_trait]
pub trait IdentityService: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve a bearer token into its session, `None` when the token is unknown or expired
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Create the account. The session is `None` when the backend requires email confirmation
    async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<(AuthUser, Option<Session>)>;

    async fn sign_out(&self, access_token: &str) -> Result<()>;

    async fn reset_password_for_email(&self, email: &str) -> Result<()>;

    /// Push channel for sign-in/sign-out notifications
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
