//! Post service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use sea_orm::Set;
use validator::{Validate, ValidationError};
use yatube_common::{
    AppError, AppResult, IdGenerator, StorageBackend, image_storage_key, suffixed_key,
};
use yatube_db::{
    Page,
    entities::{group, post, user},
    repositories::{GroupRepository, PostFilter, PostRepository, UserRepository},
};

use super::media::ImageUpload;

/// Storage keys tried for one upload before giving up.
const STORE_ATTEMPTS: usize = 5;

/// A post together with its author and group, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithRelations {
    pub post: post::Model,
    pub author: user::Model,
    pub group: Option<group::Model>,
}

/// Input for publishing a post.
#[derive(Debug, Clone, Validate)]
pub struct CreatePostInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    pub group_id: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Input for editing a post.
#[derive(Debug, Clone, Validate)]
pub struct UpdatePostInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
    pub group_id: Option<String>,
    pub image: ImageChange,
}

/// What happens to a post's image on edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageChange {
    /// Leave the current image (or its absence) untouched.
    #[default]
    Keep,
    /// Store a new image in place of the current one.
    Replace(ImageUpload),
    /// Remove the image from the post.
    Clear,
}

/// Publication-date windows offered by the moderation post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedWithin {
    Today,
    PastWeek,
    ThisMonth,
    ThisYear,
}

impl PublishedWithin {
    /// Parse the `date` query parameter (`today`, `week`, `month`, `year`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "week" => Some(Self::PastWeek),
            "month" => Some(Self::ThisMonth),
            "year" => Some(Self::ThisYear),
            _ => None,
        }
    }

    /// Query parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::PastWeek => "week",
            Self::ThisMonth => "month",
            Self::ThisYear => "year",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::PastWeek => "Past 7 days",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
        }
    }

    /// Every window, in display order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Today, Self::PastWeek, Self::ThisMonth, Self::ThisYear]
    }

    /// Start of the window relative to `now` (UTC calendar).
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let start_of = |date: chrono::NaiveDate| {
            Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
        };
        match self {
            Self::Today => start_of(today),
            Self::PastWeek => now - Duration::days(7),
            Self::ThisMonth => start_of(today.with_day(1).unwrap_or(today)),
            Self::ThisYear => start_of(today.with_ordinal(1).unwrap_or(today)),
        }
    }
}

/// Rejects empty and whitespace-only text.
pub fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required.".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
    per_page: u64,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        storage: Arc<dyn StorageBackend>,
        per_page: u64,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            storage,
            id_gen: IdGenerator::new(),
            per_page: per_page.max(1),
        }
    }

    /// Page size of every listing.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Public URL of a post's image.
    #[must_use]
    pub fn image_url(&self, post: &post::Model) -> Option<String> {
        post.image.as_deref().map(|key| self.storage.public_url(key))
    }

    /// Publish a new post.
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        input.validate()?;

        let group_id = self.resolve_group(input.group_id.as_deref()).await?;
        let image = match &input.image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            text: Set(input.text.trim().to_string()),
            created_at: Set(Utc::now().into()),
            image: Set(image.clone()),
            group_id: Set(group_id),
            author_id: Set(author_id.to_string()),
        };

        let post = match self.post_repo.create(model).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(image.as_deref()).await;
                return Err(e);
            }
        };
        tracing::info!(post_id = %post.id, author_id = %author_id, "Post created");
        Ok(post)
    }

    /// Edit a post. Only its author may do so.
    pub async fn update(
        &self,
        post_id: &str,
        editor_id: &str,
        input: UpdatePostInput,
    ) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        ensure_author(&post, editor_id)?;

        input.validate()?;

        let group_id = self.resolve_group(input.group_id.as_deref()).await?;
        // `stored` is only set for a file written by this call
        let (image, stored) = match &input.image {
            ImageChange::Keep => (post.image.clone(), None),
            ImageChange::Replace(upload) => {
                let key = self.store_image(upload).await?;
                (Some(key.clone()), Some(key))
            }
            ImageChange::Clear => (None, None),
        };

        let mut active: post::ActiveModel = post.into();
        active.text = Set(input.text.trim().to_string());
        active.group_id = Set(group_id);
        active.image = Set(image);

        let post = match self.post_repo.update(active).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(stored.as_deref()).await;
                return Err(e);
            }
        };
        tracing::info!(post_id = %post.id, "Post updated");
        Ok(post)
    }

    /// Get a post by ID.
    pub async fn get_model(&self, id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Get a post with its author and group.
    pub async fn get(&self, id: &str) -> AppResult<PostWithRelations> {
        let post = self.post_repo.get_by_id(id).await?;
        let mut loaded = self.load_relations(vec![post]).await?;
        loaded
            .pop()
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// All posts, newest first.
    pub async fn index(&self, page: Option<&str>) -> AppResult<Page<PostWithRelations>> {
        self.list(&PostFilter::default(), page).await
    }

    /// Posts of one group, newest first.
    pub async fn group_posts(
        &self,
        group_id: &str,
        page: Option<&str>,
    ) -> AppResult<Page<PostWithRelations>> {
        self.list(&PostFilter::group(group_id), page).await
    }

    /// Posts of one author, newest first.
    pub async fn profile_posts(
        &self,
        author_id: &str,
        page: Option<&str>,
    ) -> AppResult<Page<PostWithRelations>> {
        self.list(&PostFilter::author(author_id), page).await
    }

    /// Posts of every author `user_id` follows, newest first.
    pub async fn feed(
        &self,
        user_id: &str,
        page: Option<&str>,
    ) -> AppResult<Page<PostWithRelations>> {
        self.list(&PostFilter::followed_by(user_id), page).await
    }

    /// Moderation listing: text search and publication-date window.
    pub async fn search(
        &self,
        text: Option<&str>,
        within: Option<PublishedWithin>,
        page: Option<&str>,
    ) -> AppResult<Page<PostWithRelations>> {
        let filter = PostFilter {
            text_contains: text.map(str::to_string),
            published_since: within.map(|w| w.since(Utc::now()).into()),
            ..PostFilter::default()
        };
        self.list(&filter, page).await
    }

    /// Count all posts.
    pub async fn count(&self) -> AppResult<u64> {
        self.post_repo.count().await
    }

    /// Count posts written by a user.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        self.post_repo.count_by_author(author_id).await
    }

    /// Move a post to another group, or out of any group.
    pub async fn set_group(&self, post_id: &str, group_id: Option<&str>) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let group_id = self.resolve_group(group_id).await?;

        let mut active: post::ActiveModel = post.into();
        active.group_id = Set(group_id);

        let post = self.post_repo.update(active).await?;
        tracing::info!(post_id = %post.id, group_id = ?post.group_id, "Post group changed");
        Ok(post)
    }

    /// Delete a post, its comments and its stored image.
    pub async fn delete(&self, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.post_repo.delete(&post.id).await?;

        if let Some(key) = &post.image
            && let Err(e) = self.storage.delete(key).await
        {
            tracing::warn!(error = %e, key = %key, "Failed to delete post image");
        }

        tracing::info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    async fn list(
        &self,
        filter: &PostFilter,
        page: Option<&str>,
    ) -> AppResult<Page<PostWithRelations>> {
        let page = self.post_repo.find_page(filter, page, self.per_page).await?;
        let Page {
            items,
            number,
            num_pages,
            count,
            per_page,
        } = page;
        let items = self.load_relations(items).await?;
        Ok(Page::new(items, number, num_pages, count, per_page))
    }

    /// Batch-load authors and groups for a list of posts.
    async fn load_relations(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostWithRelations>> {
        let author_ids: Vec<String> = posts
            .iter()
            .map(|p| p.author_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let group_ids: Vec<String> = posts
            .iter()
            .filter_map(|p| p.group_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let groups: HashMap<String, group::Model> = self
            .group_repo
            .find_by_ids(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let Some(author) = authors.get(&post.author_id).cloned() else {
                    tracing::warn!(post_id = %post.id, "Post author missing");
                    return None;
                };
                let group = post.group_id.as_ref().and_then(|id| groups.get(id).cloned());
                Some(PostWithRelations {
                    post,
                    author,
                    group,
                })
            })
            .collect())
    }

    /// Map an optional group ID to a stored group, rejecting unknown IDs.
    async fn resolve_group(&self, group_id: Option<&str>) -> AppResult<Option<String>> {
        match group_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => Ok(None),
            Some(id) => match self.group_repo.find_by_id(id).await? {
                Some(group) => Ok(Some(group.id)),
                None => Err(AppError::Validation(
                    "Select a valid choice. That choice is not one of the available choices."
                        .to_string(),
                )),
            },
        }
    }

    /// Store an uploaded image under `posts/`, returning its storage key.
    ///
    /// A taken name gets a random suffix; the backend refuses to overwrite,
    /// so concurrent uploads of one name never clobber each other.
    async fn store_image(&self, upload: &ImageUpload) -> AppResult<String> {
        let format = upload.format()?;

        let key = image_storage_key(&upload.file_name);
        let mut candidate = key.clone();
        for _ in 0..STORE_ATTEMPTS {
            match self
                .storage
                .upload(&candidate, &upload.data, format.to_mime_type())
                .await
            {
                Ok(stored) => return Ok(stored.key),
                Err(AppError::Conflict(_)) => {
                    candidate = suffixed_key(&key, &self.id_gen.generate_suffix());
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Storage(format!("No free storage key for {key}")))
    }

    /// Remove an image stored for a post that was never saved.
    async fn discard_image(&self, key: Option<&str>) {
        if let Some(key) = key
            && let Err(e) = self.storage.delete(key).await
        {
            tracing::warn!(error = %e, key = %key, "Failed to remove orphaned image");
        }
    }
}

fn ensure_author(post: &post::Model, user_id: &str) -> AppResult<()> {
    if post.author_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author can edit this post".to_string(),
        ))
    }
}
