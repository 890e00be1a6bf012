pub mod cache;
pub mod cli;
pub mod fallback;
pub mod logging;
pub mod manager;
pub mod media;
pub mod normalize;
pub mod providers;
pub mod rate_limiter;

pub use cache::{CacheKey, ResponseCache};
pub use cli::{handle_command, SourceArgs, SourceCommands};
pub use manager::{FetchManager, SourceUsageSnapshot};
pub use media::{MediaAsset, MediaKind, MediaOptions, MediaOutcome, MediaProvider, MediaService};
pub use providers::{NewsProvider, NewsRequest, RequestKind};
pub use rate_limiter::{RateLimiter, RateLimiterRegistry, RateLimiterState};

pub mod prelude {
    pub use super::manager::FetchManager;
    pub use super::providers::{NewsProvider, NewsRequest, RequestKind};
    pub use lx_core::{Article, Category, Error, Result};
}
