pub mod auth;
pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use auth::IdentityService;
pub use config::Config;
pub use error::{Error, Result};
pub use storage::{Filter, Record, RecordStore};
pub use types::{Article, AuthEvent, AuthUser, Category, SavedArticle, Session, UserProfile};
