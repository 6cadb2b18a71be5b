//! Post, group, profile and follow pages.

use axum::{
    Form, Router,
    extract::{Multipart, Path, Query, State},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use yatube_common::{AppError, AppResult};
use yatube_core::{FollowResult, PostWithRelations};
use yatube_db::{
    Page,
    entities::{self, user},
};

use crate::{
    cache::{ResponseCache, cache_page},
    csrf::{Csrf, CsrfForm},
    extractors::{AuthUser, MaybeAuthUser},
    forms::{CommentForm, FormErrors, PostForm},
    middleware::AppState,
    response::{profile_url, redirect, render},
    templates::{
        CommentView, FollowTemplate, GroupListTemplate, GroupOption, IndexTemplate, Nav,
        Paginator, PostCard, PostDetailTemplate, PostFormTemplate, ProfileTemplate,
    },
};

/// `?page=N`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

const TITLE_CHARS: usize = 30;

fn post_cards(state: &AppState, page: &Page<PostWithRelations>) -> Vec<PostCard> {
    page.items
        .iter()
        .map(|item| PostCard::new(item, state.post_service.image_url(&item.post)))
        .collect()
}

/// Home page: every post, newest first.
async fn index(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let page = state.post_service.index(query.page.as_deref()).await?;

    render(&IndexTemplate {
        nav: Nav::new(user.as_ref()),
        posts: post_cards(&state, &page),
        paginator: Paginator::new(&page),
    })
}

/// Posts of one group.
async fn group_list(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let group = state.group_service.get_by_slug(&slug).await?;
    let page = state
        .post_service
        .group_posts(&group.id, query.page.as_deref())
        .await?;

    render(&GroupListTemplate {
        nav: Nav::new(user.as_ref()),
        group_title: group.title,
        group_description: group.description,
        posts: post_cards(&state, &page),
        paginator: Paginator::new(&page),
    })
}

/// Posts of one author.
async fn profile(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let author = state.user_service.get_by_username(&username).await?;
    let page = state
        .post_service
        .profile_posts(&author.id, query.page.as_deref())
        .await?;

    let following = match &user {
        Some(viewer) => {
            state
                .following_service
                .is_following(&viewer.id, &author.id)
                .await?
        }
        None => false,
    };
    let followers_count = state.following_service.count_followers(&author.id).await?;

    render(&ProfileTemplate {
        nav: Nav::new(user.as_ref()),
        author_name: author.display_name(),
        posts_count: page.count,
        followers_count,
        following,
        show_follow_button: user.as_ref().is_some_and(|viewer| viewer.id != author.id),
        posts: post_cards(&state, &page),
        paginator: Paginator::new(&page),
        author_username: author.username,
    })
}

/// A single post with its comments.
async fn post_detail(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
) -> AppResult<Html<String>> {
    let item = state.post_service.get(&post_id).await?;
    let author_posts_count = state.post_service.count_by_author(&item.author.id).await?;
    let comments = state.comment_service.list_for_post(&item.post.id).await?;

    let csrf_token = if user.is_some() {
        csrf.token().await?
    } else {
        String::new()
    };

    render(&PostDetailTemplate {
        nav: Nav::new(user.as_ref()),
        title: item.post.text.chars().take(TITLE_CHARS).collect(),
        can_edit: user.as_ref().is_some_and(|u| u.id == item.author.id),
        post: PostCard::new(&item, state.post_service.image_url(&item.post)),
        author_posts_count,
        comments: comments.iter().map(CommentView::from).collect(),
        show_comment_form: user.is_some(),
        comment_label: CommentForm::TEXT_LABEL,
        csrf_token,
    })
}

/// Values a post form is rendered with.
struct PostFormPage<'a> {
    action: String,
    is_edit: bool,
    text: &'a str,
    group_id: Option<&'a str>,
    image_url: Option<String>,
    errors: FormErrors,
}

async fn render_post_form(
    state: &AppState,
    user: &user::Model,
    csrf: &Csrf,
    page: PostFormPage<'_>,
) -> AppResult<Html<String>> {
    let groups = state.group_service.list().await?;

    render(&PostFormTemplate {
        nav: Nav::new(Some(user)),
        is_edit: page.is_edit,
        action: page.action,
        text: page.text.to_string(),
        groups: GroupOption::list(&groups, page.group_id),
        has_image: page.image_url.is_some(),
        image_url: page.image_url.unwrap_or_default(),
        errors: page.errors,
        csrf_token: csrf.token().await?,
        text_label: PostForm::TEXT_LABEL,
        text_help: PostForm::TEXT_HELP,
        group_label: PostForm::GROUP_LABEL,
        group_help: PostForm::GROUP_HELP,
        image_label: PostForm::IMAGE_LABEL,
    })
}

/// Empty post form.
async fn post_create_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
) -> AppResult<Html<String>> {
    render_post_form(
        &state,
        &user,
        &csrf,
        PostFormPage {
            action: "/create/".to_string(),
            is_edit: false,
            text: "",
            group_id: None,
            image_url: None,
            errors: FormErrors::new(),
        },
    )
    .await
}

/// Publish a post and go to the author's profile.
async fn post_create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = PostForm::from_multipart(multipart).await?;
    csrf.verify(&form.csrf_token).await?;

    let groups = state.group_service.list().await?;
    match form.clean_create(&groups) {
        Ok(input) => {
            state.post_service.create(&user.id, input).await?;
            Ok(redirect(&profile_url(&user.username)))
        }
        Err(errors) => Ok(render_post_form(
            &state,
            &user,
            &csrf,
            PostFormPage {
                action: "/create/".to_string(),
                is_edit: false,
                text: &form.text,
                group_id: Some(form.group.as_str()),
                image_url: None,
                errors,
            },
        )
        .await?
        .into_response()),
    }
}

/// Post form bound to the post's current values. Author only.
async fn post_edit_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
) -> AppResult<Html<String>> {
    let post = state.post_service.get_model(&post_id).await?;
    ensure_author(&post, &user)?;

    render_post_form(
        &state,
        &user,
        &csrf,
        PostFormPage {
            action: format!("/posts/{}/edit/", post.id),
            is_edit: true,
            text: &post.text,
            group_id: post.group_id.as_deref(),
            image_url: state.post_service.image_url(&post),
            errors: FormErrors::new(),
        },
    )
    .await
}

/// Apply an edit and go to the post's page. Author only.
async fn post_edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = PostForm::from_multipart(multipart).await?;
    csrf.verify(&form.csrf_token).await?;

    let post = state.post_service.get_model(&post_id).await?;
    ensure_author(&post, &user)?;

    let groups = state.group_service.list().await?;
    match form.clean_update(&groups) {
        Ok(input) => {
            state.post_service.update(&post.id, &user.id, input).await?;
            Ok(redirect(&format!("/posts/{}/", post.id)))
        }
        Err(errors) => Ok(render_post_form(
            &state,
            &user,
            &csrf,
            PostFormPage {
                action: format!("/posts/{}/edit/", post.id),
                is_edit: true,
                text: &form.text,
                group_id: Some(form.group.as_str()),
                image_url: state.post_service.image_url(&post),
                errors,
            },
        )
        .await?
        .into_response()),
    }
}

fn ensure_author(post: &entities::post::Model, user: &user::Model) -> AppResult<()> {
    if post.author_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author can edit this post".to_string(),
        ))
    }
}

/// Comment on a post. Invalid comments are dropped.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    csrf: Csrf,
    Path(post_id): Path<String>,
    Form(form): Form<CsrfForm<CommentForm>>,
) -> AppResult<Response> {
    csrf.verify(&form.csrfmiddlewaretoken).await?;

    match form.data.clean() {
        Ok(input) => {
            state.comment_service.create(&post_id, &user.id, input).await?;
        }
        Err(errors) => {
            tracing::debug!(post_id = %post_id, errors = ?errors, "Dropped invalid comment");
        }
    }

    Ok(redirect(&format!("/posts/{post_id}/")))
}

/// Posts by every author the user follows.
async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let page = state.post_service.feed(&user.id, query.page.as_deref()).await?;

    render(&FollowTemplate {
        nav: Nav::new(Some(&user)),
        posts: post_cards(&state, &page),
        paginator: Paginator::new(&page),
    })
}

/// Follow an author.
async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let author = state.user_service.get_by_username(&username).await?;
    let result = state.following_service.follow(&user.id, &author.id).await?;
    if result == FollowResult::SelfFollow {
        tracing::debug!(user_id = %user.id, "Ignored self-follow");
    }
    Ok(redirect("/follow/"))
}

/// Unfollow an author.
async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let author = state.user_service.get_by_username(&username).await?;
    state.following_service.unfollow(&user.id, &author.id).await?;
    Ok(redirect("/follow/"))
}

pub fn router(cache: ResponseCache) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(index).layer(middleware::from_fn_with_state(cache, cache_page)),
        )
        .route("/group/{slug}/", get(group_list))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route("/posts/{post_id}/", get(post_detail))
        .route("/posts/{post_id}/edit/", get(post_edit_form).post(post_edit))
        .route("/posts/{post_id}/comment/", post(add_comment))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/follow/", get(follow_index))
}
