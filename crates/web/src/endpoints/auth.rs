//! Signup, login and logout pages.

use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use yatube_common::{AppError, AppResult};
use yatube_db::entities::user;

use crate::{
    csrf::{Csrf, CsrfForm},
    extractors::MaybeAuthUser,
    forms::{FormErrors, LoginForm, SignupForm},
    middleware::{AppState, SESSION_USER_KEY},
    response::{redirect, render, safe_next},
    templates::{LoggedOutTemplate, LoginTemplate, Nav, SignupTemplate},
};

const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// `?next=/path/`
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Bind the session to `user` under a fresh session ID and CSRF token.
async fn login_session(session: &Session, csrf: &Csrf, user: &user::Model) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    session
        .insert(SESSION_USER_KEY, &user.id)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    csrf.rotate().await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");
    Ok(())
}

fn signup_page(
    user: Option<&user::Model>,
    form: &SignupForm,
    errors: FormErrors,
    csrf_token: String,
) -> AppResult<Html<String>> {
    render(&SignupTemplate {
        nav: Nav::new(user),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        username: form.username.clone(),
        email: form.email.clone(),
        errors,
        csrf_token,
    })
}

/// Signup form.
async fn signup_form(
    MaybeAuthUser(user): MaybeAuthUser,
    csrf: Csrf,
) -> AppResult<Html<String>> {
    signup_page(
        user.as_ref(),
        &SignupForm::default(),
        FormErrors::new(),
        csrf.token().await?,
    )
}

/// Create an account and log it in.
async fn signup(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    session: Session,
    csrf: Csrf,
    Form(form): Form<CsrfForm<SignupForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;
    let form = form.data;

    let errors = match form.clean() {
        Ok(input) => match state.user_service.signup(input).await {
            Ok(new_user) => {
                login_session(&session, &csrf, &new_user).await?;
                return Ok(redirect("/"));
            }
            Err(AppError::Conflict(message)) => FormErrors::single("username", message),
            Err(e) => return Err(e),
        },
        Err(errors) => errors,
    };

    Ok(signup_page(user.as_ref(), &form, errors, csrf.token().await?)?.into_response())
}

fn login_page(
    user: Option<&user::Model>,
    username: &str,
    next: Option<&str>,
    errors: FormErrors,
    csrf_token: String,
) -> AppResult<Html<String>> {
    render(&LoginTemplate {
        nav: Nav::new(user),
        username: username.to_string(),
        next: next.unwrap_or_default().to_string(),
        errors,
        csrf_token,
    })
}

/// Login form.
async fn login_form(
    MaybeAuthUser(user): MaybeAuthUser,
    csrf: Csrf,
    Query(query): Query<NextQuery>,
) -> AppResult<Html<String>> {
    login_page(
        user.as_ref(),
        "",
        query.next.as_deref(),
        FormErrors::new(),
        csrf.token().await?,
    )
}

/// Log in with username and password, then go to `next`.
async fn login(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    session: Session,
    csrf: Csrf,
    Form(form): Form<CsrfForm<LoginForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;
    let form = form.data;

    let errors = match form.clean() {
        Ok((username, password)) => match state.user_service.authenticate(username, password).await
        {
            Ok(account) => {
                login_session(&session, &csrf, &account).await?;
                return Ok(redirect(safe_next(form.next.as_deref())));
            }
            Err(AppError::Unauthorized) => {
                tracing::debug!(username = %username, "Login failed");
                let mut errors = FormErrors::new();
                errors.add_non_field(INVALID_LOGIN);
                errors
            }
            Err(e) => return Err(e),
        },
        Err(errors) => errors,
    };

    Ok(login_page(
        user.as_ref(),
        &form.username,
        form.next.as_deref(),
        errors,
        csrf.token().await?,
    )?
    .into_response())
}

async fn logout_session(session: &Session, user: Option<&user::Model>) -> AppResult<Html<String>> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }

    render(&LoggedOutTemplate {
        nav: Nav::default(),
    })
}

/// Log out via link.
async fn logout(
    MaybeAuthUser(user): MaybeAuthUser,
    session: Session,
) -> AppResult<Html<String>> {
    logout_session(&session, user.as_ref()).await
}

/// Log out via form.
async fn logout_form(
    MaybeAuthUser(user): MaybeAuthUser,
    session: Session,
    csrf: Csrf,
    Form(form): Form<CsrfForm<LogoutForm>>,
) -> AppResult<Html<String>> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;
    logout_session(&session, user.as_ref()).await
}

/// The logout form has no fields of its own.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutForm {}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", get(signup_form).post(signup))
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", get(logout).post(logout_form))
}
