use lx_core::{Config, RecordStore};
use std::sync::Arc;

pub mod accounts;
pub mod backends;
pub mod identity;
pub mod local;
pub mod saved;

pub use accounts::{Accounts, SignedIn, SignedUp};
pub use backends::*;
pub use identity::{create_identity, MemoryIdentity, SupabaseIdentity, UnconfiguredIdentity};
pub use local::LocalSavedStore;
pub use saved::{SaveOutcome, SavedArticles};

/// Remote record store from the backend config, `None` when unconfigured.
pub fn create_store(config: &Config, client: reqwest::Client) -> Option<Arc<dyn RecordStore>> {
    config
        .backend
        .as_ref()
        .map(|backend| Arc::new(RestRecordStore::new(backend, client)) as Arc<dyn RecordStore>)
}

pub mod prelude {
    pub use super::accounts::Accounts;
    pub use super::backends::*;
    pub use super::saved::{SaveOutcome, SavedArticles};
    pub use lx_core::{Filter, Record, RecordStore};
}
