//! HTTP layer for yatube.
//!
//! Server-rendered pages on top of the core services:
//!
//! - **Endpoints**: posts, groups, profiles, follows, accounts, moderation
//! - **Extractors**: the current user as an explicit request context
//! - **Middleware**: authentication, error pages, the home page cache
//! - **Forms**: submissions cleaned into service inputs or field errors
//!
//! Built on Axum 0.8 with Tower middleware, askama templates and
//! tower-sessions.

pub mod cache;
pub mod csrf;
pub mod endpoints;
pub mod extractors;
pub mod forms;
pub mod middleware;
pub mod response;
pub mod templates;

use axum::{Router, extract::DefaultBodyLimit};
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};
use tower_sessions::{MemoryStore, SessionManagerLayer, cookie::SameSite};

pub use cache::ResponseCache;
pub use endpoints::router;
pub use middleware::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "yatube_session";

/// Build the complete application: pages, uploaded media, sessions,
/// authentication, error pages and request tracing.
pub fn app(state: AppState) -> Router {
    let site = state.site.clone();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(site.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true);

    let media_url = match site.media_url.trim_end_matches('/') {
        "" => "/media".to_string(),
        url if url.starts_with('/') => url.to_string(),
        url => format!("/{url}"),
    };

    Router::new()
        .merge(router(state.cache.clone()))
        .nest_service(&media_url, ServeDir::new(&site.media_root))
        .fallback(endpoints::errors::not_found)
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn(middleware::error_page_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(session_layer)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(site.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
