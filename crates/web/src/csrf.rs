//! CSRF protection.
//!
//! Each session carries a random token. Forms embed it in the
//! `csrfmiddlewaretoken` field and state-changing handlers compare the
//! submitted value with the session's.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use yatube_common::{AppError, AppResult, IdGenerator};

/// Session key of the token.
pub const CSRF_SESSION_KEY: &str = "csrf_token";

/// Form field carrying the token.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

/// Form data wrapper that carries the CSRF token next to the form fields.
#[derive(Debug, Deserialize)]
pub struct CsrfForm<T> {
    #[serde(default)]
    pub csrfmiddlewaretoken: String,
    #[serde(flatten)]
    pub data: T,
}

/// Per-request CSRF guard.
#[derive(Clone)]
pub struct Csrf {
    session: Session,
}

impl<S> FromRequestParts<S> for Csrf
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self { session })
    }
}

impl Csrf {
    /// The session's token, creating one if needed.
    pub async fn token(&self) -> AppResult<String> {
        csrf_token(&self.session).await
    }

    /// Replace the session's token, e.g. after login.
    pub async fn rotate(&self) -> AppResult<String> {
        let token = IdGenerator::new().generate_token();
        self.session
            .insert(CSRF_SESSION_KEY, &token)
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;
        Ok(token)
    }

    /// Check a submitted token against the session's.
    pub async fn verify(&self, submitted: &str) -> AppResult<()> {
        let stored: Option<String> = self
            .session
            .get(CSRF_SESSION_KEY)
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;

        match stored {
            None => Err(AppError::CsrfFailure("CSRF cookie not set.".to_string())),
            Some(_) if submitted.is_empty() => {
                Err(AppError::CsrfFailure("CSRF token missing.".to_string()))
            }
            Some(expected) if expected == submitted => Ok(()),
            Some(_) => Err(AppError::CsrfFailure("CSRF token incorrect.".to_string())),
        }
    }
}

/// Get or create the CSRF token of a session.
pub async fn csrf_token(session: &Session) -> AppResult<String> {
    let existing: Option<String> = session
        .get(CSRF_SESSION_KEY)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    if let Some(token) = existing {
        return Ok(token);
    }

    let token = IdGenerator::new().generate_token();
    session
        .insert(CSRF_SESSION_KEY, &token)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    tracing::debug!("Issued CSRF token");
    Ok(token)
}
