//! Error pages.

use axum::{http::StatusCode, response::Html};
use yatube_common::{AppError, AppResult};

use crate::{
    response::render,
    templates::{CsrfFailureTemplate, ForbiddenTemplate, Nav, NotFoundTemplate, ServerErrorTemplate},
};

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Page".to_string())
}

/// Render the page for an error status. `code` is the error code of the
/// [`AppError`] that produced the response, if any.
pub fn render_error_page(
    status: StatusCode,
    code: Option<&str>,
    path: &str,
    nav: Nav,
) -> AppResult<Html<String>> {
    let path = path.to_string();
    match status {
        StatusCode::NOT_FOUND => render(&NotFoundTemplate { nav, path }),
        StatusCode::FORBIDDEN if code == Some("CSRF_FAILURE") => {
            render(&CsrfFailureTemplate { nav, path })
        }
        StatusCode::FORBIDDEN => render(&ForbiddenTemplate { nav, path }),
        _ => render(&ServerErrorTemplate { nav, path }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_failure_has_its_own_page() {
        let csrf = render_error_page(StatusCode::FORBIDDEN, Some("CSRF_FAILURE"), "/create/", Nav::default())
            .unwrap()
            .0;
        let denied = render_error_page(StatusCode::FORBIDDEN, Some("FORBIDDEN"), "/create/", Nav::default())
            .unwrap()
            .0;

        assert!(csrf.contains("CSRF verification failed"));
        assert!(!denied.contains("CSRF verification failed"));
        assert!(denied.contains("/create/"));
    }

    #[test]
    fn test_server_error_page() {
        let html = render_error_page(StatusCode::INTERNAL_SERVER_ERROR, None, "/", Nav::default())
            .unwrap()
            .0;
        assert!(html.contains("Server error"));
    }
}
