//! Post repository.

use std::sync::Arc;

use crate::entities::{Follow, Post, follow, post};
use crate::pagination::{Page, num_pages, resolve_page_number};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, prelude::DateTimeWithTimeZone,
};
use yatube_common::{AppError, AppResult};

/// Restrictions applied to a post listing.
///
/// Every listing is ordered newest first (`created_at DESC, id DESC`).
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Only posts in this group.
    pub group_id: Option<String>,
    /// Only posts by this author.
    pub author_id: Option<String>,
    /// Only posts by authors this user follows.
    pub followed_by: Option<String>,
    /// Only posts whose text contains this substring.
    pub text_contains: Option<String>,
    /// Only posts published at or after this instant.
    pub published_since: Option<DateTimeWithTimeZone>,
}

impl PostFilter {
    /// Posts of one group.
    #[must_use]
    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            ..Self::default()
        }
    }

    /// Posts of one author.
    #[must_use]
    pub fn author(author_id: impl Into<String>) -> Self {
        Self {
            author_id: Some(author_id.into()),
            ..Self::default()
        }
    }

    /// Posts of every author `user_id` follows.
    #[must_use]
    pub fn followed_by(user_id: impl Into<String>) -> Self {
        Self {
            followed_by: Some(user_id.into()),
            ..Self::default()
        }
    }

    fn apply(&self, mut query: Select<Post>) -> Select<Post> {
        if let Some(group_id) = &self.group_id {
            query = query.filter(post::Column::GroupId.eq(group_id.as_str()));
        }
        if let Some(author_id) = &self.author_id {
            query = query.filter(post::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(user_id) = &self.followed_by {
            let followed = Follow::find()
                .select_only()
                .column(follow::Column::AuthorId)
                .filter(follow::Column::UserId.eq(user_id.as_str()))
                .into_query();
            query = query.filter(post::Column::AuthorId.in_subquery(followed));
        }
        if let Some(text) = self.text_contains.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(post::Column::Text.contains(text));
        }
        if let Some(since) = self.published_since {
            query = query.filter(post::Column::CreatedAt.gte(since));
        }
        query
    }
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post (its comments go with it).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let post = self.get_by_id(id).await?;
        post.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count all posts.
    pub async fn count(&self) -> AppResult<u64> {
        Post::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts written by a user.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of posts matching `filter`, newest first.
    ///
    /// `page` is the raw `page` query parameter; see
    /// [`resolve_page_number`] for how it is interpreted.
    pub async fn find_page(
        &self,
        filter: &PostFilter,
        page: Option<&str>,
        per_page: u64,
    ) -> AppResult<Page<post::Model>> {
        let query = filter
            .apply(Post::find())
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id);

        let count = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let num_pages = num_pages(count, per_page);
        let number = resolve_page_number(page, num_pages);

        let items = query
            .offset((number - 1) * per_page)
            .limit(per_page)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(items, number, num_pages, count, per_page))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: format!("Post {id}"),
            created_at: Utc::now().into(),
            image: None,
            group_id: None,
            author_id: author_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let post = create_test_post("p1", "u1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let found = repo.get_by_id("p1").await.unwrap();

        assert_eq!(found.author_id, "u1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_followed_by_filters_through_follow_table() {
        let sql = PostFilter::followed_by("u1")
            .apply(Post::find())
            .build(sea_orm::DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"IN (SELECT "follow"."author_id" FROM "follow""#));
        assert!(sql.contains(r#""user_id" = 'u1'"#));
    }

    #[test]
    fn test_filter_constructors() {
        let filter = PostFilter::group("g1");
        assert_eq!(filter.group_id.as_deref(), Some("g1"));
        assert_eq!(filter.author_id, None);

        let filter = PostFilter::author("u1");
        assert_eq!(filter.author_id.as_deref(), Some("u1"));
        assert_eq!(filter.followed_by, None);
    }
}
