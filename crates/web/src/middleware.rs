//! Application state and request middleware.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use tower_sessions::Session;
use yatube_common::{ErrorCode, StorageBackend, config::SiteConfig};
use yatube_core::{CommentService, FollowingService, GroupService, PostService, UserService};
use yatube_db::{
    entities::user,
    repositories::{
        CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
    },
};

use crate::cache::ResponseCache;
use crate::endpoints::errors;
use crate::templates::Nav;

/// Session key holding the logged-in user's ID.
pub const SESSION_USER_KEY: &str = "user_id";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub group_service: GroupService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub following_service: FollowingService,
    pub cache: ResponseCache,
    pub site: SiteConfig,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        site: SiteConfig,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let group_repo = GroupRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let follow_repo = FollowRepository::new(Arc::clone(&db));

        Self {
            user_service: UserService::new(user_repo.clone()),
            group_service: GroupService::new(group_repo.clone()),
            post_service: PostService::new(
                post_repo.clone(),
                user_repo.clone(),
                group_repo,
                storage,
                site.posts_per_page,
            ),
            comment_service: CommentService::new(comment_repo, post_repo, user_repo),
            following_service: FollowingService::new(follow_repo),
            cache: ResponseCache::new(Duration::from_secs(site.index_cache_ttl_secs)),
            site,
        }
    }
}

/// Authentication middleware.
///
/// Resolves the logged-in user from the session and stores it in the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    match session.get::<String>(SESSION_USER_KEY).await {
        Ok(Some(user_id)) => match state.user_service.get(&user_id).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(user_id = %user_id, "Session user no longer exists");
                if let Err(e) = session.remove::<String>(SESSION_USER_KEY).await {
                    tracing::warn!(error = %e, "Failed to clear stale session user");
                }
            }
            Err(e) => return e.into_response(),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read session"),
    }

    next.run(req).await
}

/// Replace the body of 403, 404 and 500 responses with the matching
/// error page, keeping the status code.
pub async fn error_page_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let nav = Nav::new(req.extensions().get::<user::Model>());

    let response = next.run(req).await;
    let status = response.status();
    if !matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR
    ) {
        return response;
    }

    let code = response.extensions().get::<ErrorCode>().map(|c| c.0);
    match errors::render_error_page(status, code, &path, nav) {
        Ok(page) => (status, page).into_response(),
        Err(e) => {
            tracing::error!(error = %e, status = %status, "Failed to render error page");
            response
        }
    }
}
