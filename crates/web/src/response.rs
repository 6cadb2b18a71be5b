//! Response helpers.

use askama::Template;
use axum::response::{Html, IntoResponse, Redirect, Response};
use yatube_common::{AppError, AppResult};

/// Login route anonymous users are sent to.
pub const LOGIN_URL: &str = "/auth/login/";

/// Render a template into an HTML response.
pub fn render<T: Template>(template: &T) -> AppResult<Html<String>> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Template(e.to_string()))
}

/// `303 See Other` to `location`.
#[must_use]
pub fn redirect(location: &str) -> Response {
    Redirect::to(location).into_response()
}

/// Login URL that returns to `next` afterwards. `next` is percent-encoded
/// except for `/`.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!(
        "{LOGIN_URL}?next={}",
        urlencoding::encode(next).replace("%2F", "/")
    )
}

/// Profile page of `username`.
#[must_use]
pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// Redirect to the login page, returning to `next` afterwards.
#[must_use]
pub fn login_redirect(next: &str) -> Response {
    redirect(&login_url(next))
}

/// Accept `next` only when it is a path on this site.
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && path.chars().all(|c| c.is_ascii_graphic() && c != '\\') =>
        {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/posts/01j/comment/"),
            "/auth/login/?next=/posts/01j/comment/"
        );
    }

    #[test]
    fn test_login_url_encodes_query() {
        assert_eq!(
            login_url("/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn test_profile_url_is_ascii() {
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(profile_url("лев"), "/profile/%D0%BB%D0%B5%D0%B2/");
    }

    #[test]
    fn test_redirect_is_see_other() {
        let response = redirect("/follow/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/follow/");
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/create/")), "/create/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(Some("/профиль/")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
