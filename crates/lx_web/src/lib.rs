use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod response;
pub mod state;
pub mod validation;

pub use response::{ApiError, ApiResult, Envelope};
pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news", get(handlers::news::get_news))
        .route("/api/search", get(handlers::news::search))
        .route("/api/google-news", get(handlers::news::google_news))
        .route("/api/cache/clear", post(handlers::news::clear_cache))
        .route("/api/status", get(handlers::news::status))
        .route("/api/health", get(handlers::news::health))
        .route("/api/pexels", get(handlers::news::media))
        .route(
            "/api/saved-articles",
            get(handlers::saved::list)
                .post(handlers::saved::save)
                .delete(handlers::saved::remove),
        )
        .route("/api/saved-articles/:id", get(handlers::saved::get_one))
        .route("/api/auth/signin", post(handlers::auth::sign_in))
        .route("/api/auth/signup", post(handlers::auth::sign_up))
        .route("/api/auth/signout", post(handlers::auth::sign_out))
        .route("/api/auth/reset-password", post(handlers::auth::reset_password))
        .route("/api/auth/session", get(handlers::auth::session))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, ApiError, AppState};
    pub use lx_core::{Article, Error, Result};
}
