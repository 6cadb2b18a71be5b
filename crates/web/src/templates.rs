//! Askama templates and the view models they display.

#![allow(missing_docs)]

use askama::Template;
use yatube_core::{CommentWithAuthor, PostWithRelations, PublishedWithin};
use yatube_db::{Page, entities::{group, user}};

use crate::forms::FormErrors;

/// Placeholder shown for an empty value in moderation lists.
pub const EMPTY_VALUE: &str = "-empty-";

const DATE_FORMAT: &str = "%-d %B %Y";
const DATETIME_FORMAT: &str = "%-d %B %Y %H:%M";

/// Navigation bar state.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub is_authenticated: bool,
    pub username: String,
    pub is_admin: bool,
}

impl Nav {
    #[must_use]
    pub fn new(user: Option<&user::Model>) -> Self {
        user.map_or_else(Self::default, |user| Self {
            is_authenticated: true,
            username: user.username.clone(),
            is_admin: user.is_admin,
        })
    }
}

/// A post as shown in listings and on its own page.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: String,
    pub text: String,
    pub published: String,
    pub author_username: String,
    pub author_name: String,
    pub has_group: bool,
    pub group_title: String,
    pub group_slug: String,
    pub has_image: bool,
    pub image_url: String,
}

impl PostCard {
    #[must_use]
    pub fn new(item: &PostWithRelations, image_url: Option<String>) -> Self {
        let (group_title, group_slug) = item
            .group
            .as_ref()
            .map(|g| (g.title.clone(), g.slug.clone()))
            .unwrap_or_default();
        Self {
            id: item.post.id.clone(),
            text: item.post.text.clone(),
            published: item.post.created_at.format(DATE_FORMAT).to_string(),
            author_username: item.author.username.clone(),
            author_name: item.author.display_name(),
            has_group: item.group.is_some(),
            group_title,
            group_slug,
            has_image: image_url.is_some(),
            image_url: image_url.unwrap_or_default(),
        }
    }
}

/// A comment under a post.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentWithAuthor> for CommentView {
    fn from(item: &CommentWithAuthor) -> Self {
        Self {
            author_username: item.author.username.clone(),
            author_name: item.author.display_name(),
            text: item.comment.text.clone(),
            published: item.comment.created_at.format(DATETIME_FORMAT).to_string(),
        }
    }
}

/// One entry of the page switcher.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

/// Page switcher under paginated listings.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    pub has_other_pages: bool,
    pub has_previous: bool,
    pub previous: u64,
    pub has_next: bool,
    pub next: u64,
    pub number: u64,
    pub num_pages: u64,
    pub links: Vec<PageLink>,
    /// Query string up to and including `page=`.
    pub query_prefix: String,
}

impl Paginator {
    /// Switcher for `page`, linking to `?page=N`.
    #[must_use]
    pub fn new<T>(page: &Page<T>) -> Self {
        Self::with_query(page, "")
    }

    /// Switcher for `page` that keeps other query parameters (already
    /// encoded, `&`-joined).
    #[must_use]
    pub fn with_query<T>(page: &Page<T>, query: &str) -> Self {
        let query_prefix = if query.is_empty() {
            "?page=".to_string()
        } else {
            format!("?{query}&page=")
        };
        Self {
            has_other_pages: page.has_other_pages(),
            has_previous: page.has_previous(),
            previous: page.previous_page_number().unwrap_or(1),
            has_next: page.has_next(),
            next: page.next_page_number().unwrap_or(page.num_pages),
            number: page.number,
            num_pages: page.num_pages,
            links: page
                .page_range()
                .map(|number| PageLink {
                    number,
                    current: number == page.number,
                })
                .collect(),
            query_prefix,
        }
    }
}

/// An option of a group `<select>`.
#[derive(Debug, Clone)]
pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

impl GroupOption {
    /// Options for every group, marking `selected`.
    #[must_use]
    pub fn list(groups: &[group::Model], selected: Option<&str>) -> Vec<Self> {
        groups
            .iter()
            .map(|g| Self {
                id: g.id.clone(),
                title: g.title.clone(),
                selected: selected == Some(g.id.as_str()),
            })
            .collect()
    }
}

/// Home page template
#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
    pub posts: Vec<PostCard>,
    pub paginator: Paginator,
}

/// Group page template
#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub nav: Nav,
    pub group_title: String,
    pub group_description: String,
    pub posts: Vec<PostCard>,
    pub paginator: Paginator,
}

/// Profile page template
#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub author_username: String,
    pub author_name: String,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following: bool,
    pub show_follow_button: bool,
    pub posts: Vec<PostCard>,
    pub paginator: Paginator,
}

/// Post page template
#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub nav: Nav,
    pub title: String,
    pub post: PostCard,
    pub author_posts_count: u64,
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
    pub show_comment_form: bool,
    pub comment_label: &'static str,
    pub csrf_token: String,
}

/// Create/edit post template
#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub nav: Nav,
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub has_image: bool,
    pub image_url: String,
    pub errors: FormErrors,
    pub csrf_token: String,
    pub text_label: &'static str,
    pub text_help: &'static str,
    pub group_label: &'static str,
    pub group_help: &'static str,
    pub image_label: &'static str,
}

/// Follow feed template
#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub nav: Nav,
    pub posts: Vec<PostCard>,
    pub paginator: Paginator,
}

/// Login template
#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
    pub csrf_token: String,
}

/// Signup template
#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub nav: Nav,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
    pub csrf_token: String,
}

/// Logged-out template
#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub nav: Nav,
}

/// 404 template
#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub nav: Nav,
    pub path: String,
}

/// CSRF failure template
#[derive(Template)]
#[template(path = "core/403csrf.html")]
pub struct CsrfFailureTemplate {
    pub nav: Nav,
    pub path: String,
}

/// Permission denied template
#[derive(Template)]
#[template(path = "core/403.html")]
pub struct ForbiddenTemplate {
    pub nav: Nav,
    pub path: String,
}

/// Server error template
#[derive(Template)]
#[template(path = "core/500.html")]
pub struct ServerErrorTemplate {
    pub nav: Nav,
    pub path: String,
}

/// A row of the moderation post list.
#[derive(Debug, Clone)]
pub struct AdminPostRow {
    pub id: String,
    pub text: String,
    pub published: String,
    pub author: String,
    pub group: String,
    pub groups: Vec<GroupOption>,
}

impl AdminPostRow {
    #[must_use]
    pub fn new(item: &PostWithRelations, groups: &[group::Model]) -> Self {
        Self {
            id: item.post.id.clone(),
            text: item.post.text.clone(),
            published: item.post.created_at.format(DATETIME_FORMAT).to_string(),
            author: item.author.username.clone(),
            group: item
                .group
                .as_ref()
                .map_or_else(|| EMPTY_VALUE.to_string(), |g| g.title.clone()),
            groups: GroupOption::list(groups, item.post.group_id.as_deref()),
        }
    }
}

/// A publication-date filter link.
#[derive(Debug, Clone)]
pub struct DateFilter {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl DateFilter {
    #[must_use]
    pub fn list(selected: Option<PublishedWithin>) -> Vec<Self> {
        PublishedWithin::all()
            .into_iter()
            .map(|within| Self {
                value: within.as_str(),
                label: within.label(),
                selected: selected == Some(within),
            })
            .collect()
    }
}

/// Moderation post list template
#[derive(Template)]
#[template(path = "admin/posts.html")]
pub struct AdminPostsTemplate {
    pub nav: Nav,
    pub rows: Vec<AdminPostRow>,
    pub total: u64,
    pub query: String,
    /// `query`, percent-encoded for links.
    pub query_param: String,
    pub date_filters: Vec<DateFilter>,
    pub any_date: bool,
    pub paginator: Paginator,
    pub csrf_token: String,
}

/// A row of the group list.
#[derive(Debug, Clone)]
pub struct AdminGroupRow {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Group list and creation form template
#[derive(Template)]
#[template(path = "admin/groups.html")]
pub struct AdminGroupsTemplate {
    pub nav: Nav,
    pub groups: Vec<AdminGroupRow>,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub errors: FormErrors,
    pub csrf_token: String,
}
