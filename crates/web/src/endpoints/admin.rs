//! Moderation pages.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use yatube_common::{AppError, AppResult};
use yatube_core::PublishedWithin;
use yatube_db::entities::user;

use crate::{
    csrf::{Csrf, CsrfForm},
    extractors::AdminUser,
    forms::{FormErrors, GroupChoiceForm, GroupForm},
    middleware::AppState,
    response::{redirect, render},
    templates::{
        AdminGroupRow, AdminGroupsTemplate, AdminPostRow, AdminPostsTemplate, DateFilter, Nav,
        Paginator,
    },
};

/// Post list filters.
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub q: Option<String>,
    pub date: Option<String>,
    pub page: Option<String>,
}

/// Posts searchable by text and filterable by publication date.
async fn post_list(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Query(query): Query<PostListQuery>,
) -> AppResult<Html<String>> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let within = query.date.as_deref().and_then(PublishedWithin::parse);

    let page = state
        .post_service
        .search(text, within, query.page.as_deref())
        .await?;
    let groups = state.group_service.list().await?;

    let mut params = Vec::new();
    if let Some(text) = text {
        params.push(format!("q={}", urlencoding::encode(text)));
    }
    if let Some(within) = within {
        params.push(format!("date={}", within.as_str()));
    }

    render(&AdminPostsTemplate {
        nav: Nav::new(Some(&admin)),
        rows: page
            .items
            .iter()
            .map(|item| AdminPostRow::new(item, &groups))
            .collect(),
        total: page.count,
        query: text.unwrap_or_default().to_string(),
        query_param: urlencoding::encode(text.unwrap_or_default()).into_owned(),
        date_filters: DateFilter::list(within),
        any_date: within.is_none(),
        paginator: Paginator::with_query(&page, &params.join("&")),
        csrf_token: csrf.token().await?,
    })
}

/// Move a post to another group.
async fn change_post_group(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
    Form(form): Form<CsrfForm<GroupChoiceForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;

    state
        .post_service
        .set_group(&post_id, form.data.group_id())
        .await?;
    tracing::info!(admin_id = %admin.id, post_id = %post_id, "Post group changed by moderator");

    Ok(redirect("/admin/posts/"))
}

/// The delete form has no fields of its own.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {}

/// Delete a post.
async fn delete_post(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
    Form(form): Form<CsrfForm<DeleteForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;

    state.post_service.delete(&post_id).await?;
    tracing::info!(admin_id = %admin.id, post_id = %post_id, "Post deleted by moderator");

    Ok(redirect("/admin/posts/"))
}

async fn groups_page(
    state: &AppState,
    admin: &user::Model,
    csrf: &Csrf,
    form: &GroupForm,
    errors: FormErrors,
) -> AppResult<Html<String>> {
    let groups = state.group_service.list().await?;

    render(&AdminGroupsTemplate {
        nav: Nav::new(Some(admin)),
        groups: groups
            .into_iter()
            .map(|g| AdminGroupRow {
                title: g.title,
                slug: g.slug,
                description: g.description,
            })
            .collect(),
        title: form.title.clone(),
        slug: form.slug.clone(),
        description: form.description.clone(),
        errors,
        csrf_token: csrf.token().await?,
    })
}

/// Group list with the creation form.
async fn group_list(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    csrf: Csrf,
) -> AppResult<Html<String>> {
    groups_page(&state, &admin, &csrf, &GroupForm::default(), FormErrors::new()).await
}

/// Create a group.
async fn create_group(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Form(form): Form<CsrfForm<GroupForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;
    let form = form.data;

    let errors = match form.clean() {
        Ok(input) => match state.group_service.create(input).await {
            Ok(_) => return Ok(redirect("/admin/groups/")),
            Err(AppError::Conflict(message)) => FormErrors::single("slug", message),
            Err(e) => return Err(e),
        },
        Err(errors) => errors,
    };

    Ok(groups_page(&state, &admin, &csrf, &form, errors)
        .await?
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/posts/", get(post_list))
        .route("/admin/posts/{post_id}/group/", post(change_post_group))
        .route("/admin/posts/{post_id}/delete/", post(delete_post))
        .route("/admin/groups/", get(group_list).post(create_group))
}
