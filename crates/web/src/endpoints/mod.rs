//! HTTP endpoints.

mod admin;
mod auth;
pub mod errors;
mod posts;

use axum::Router;

use crate::cache::ResponseCache;
use crate::middleware::AppState;

/// Create the page router. `cache` backs the cached home page.
pub fn router(cache: ResponseCache) -> Router<AppState> {
    Router::new()
        .merge(posts::router(cache))
        .merge(auth::router())
        .merge(admin::router())
}
