use lx_core::{Config, RecordStore};
use lx_sources::{FetchManager, MediaService};
use lx_storage::{Accounts, SavedArticles};
use std::sync::Arc;

pub struct AppState {
    pub config: Arc<Config>,
    pub fetch: Arc<FetchManager>,
    pub media: Arc<MediaService>,
    pub saved: Arc<SavedArticles>,
    pub accounts: Arc<Accounts>,
    /// Remote record store, probed by the health check
    pub store: Option<Arc<dyn RecordStore>>,
}
