use lx_core::{Config, IdentityService};
use std::sync::Arc;
use tracing::info;

pub mod memory;
pub mod supabase;
pub mod unconfigured;

pub use memory::MemoryIdentity;
pub use supabase::SupabaseIdentity;
pub use unconfigured::UnconfiguredIdentity;

/// Identity backend by name: `supabase` (the default, needs backend config),
/// `memory`, or anything else for a backend that reports "not configured".
pub fn create_identity(kind: &str, config: &Config, client: reqwest::Client) -> Arc<dyn IdentityService> {
    let identity: Arc<dyn IdentityService> = match (kind, &config.backend) {
        ("memory", _) => Arc::new(MemoryIdentity::new()),
        ("supabase", Some(backend)) => Arc::new(SupabaseIdentity::new(backend, client)),
        _ => Arc::new(UnconfiguredIdentity::new()),
    };
    info!("🔐 Identity backend: {}", identity.name());
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use lx_core::config::BackendConfig;

    #[test]
    fn test_backend_selection() {
        let mut config = Config::default();
        let client = reqwest::Client::new();
        assert_eq!(create_identity("supabase", &config, client.clone()).name(), "unconfigured");
        assert_eq!(create_identity("memory", &config, client.clone()).name(), "memory");

        config.backend = Some(BackendConfig {
            url: "https://project.example.co".into(),
            anon_key: "anon".into(),
        });
        assert_eq!(create_identity("supabase", &config, client).name(), "supabase");
    }
}
