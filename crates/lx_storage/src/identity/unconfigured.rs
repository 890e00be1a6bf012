use async_trait::async_trait;
use lx_core::{AuthEvent, AuthUser, Error, IdentityService, Result, Session};
use tokio::sync::broadcast;

const SERVICE: &str = "Authentication service";

/// Stand-in when no identity backend is configured. Every call fails with
/// `Error::NotConfigured`; sessions simply resolve to nothing.
pub struct UnconfiguredIdentity {
    events: broadcast::Sender<AuthEvent>,
}

impl UnconfiguredIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for UnconfiguredIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityService for UnconfiguredIdentity {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn get_session(&self, _access_token: &str) -> Result<Option<Session>> {
        Ok(None)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<Session> {
        Err(Error::NotConfigured(SERVICE))
    }

    async fn sign_up(&self, _email: &str, _password: &str, _username: &str) -> Result<(AuthUser, Option<Session>)> {
        Err(Error::NotConfigured(SERVICE))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        Ok(())
    }

    async fn reset_password_for_email(&self, _email: &str) -> Result<()> {
        Err(Error::NotConfigured(SERVICE))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
