//! Comment service.

use std::collections::HashMap;

use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;
use yatube_common::{AppResult, IdGenerator};
use yatube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};

use super::post::validate_not_blank;

/// A comment together with its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWithAuthor {
    pub comment: comment::Model,
    pub author: user::Model,
}

/// Input for commenting on a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a post.
    ///
    /// The text is validated before the post is looked up, so an invalid
    /// comment on a missing post reports the validation failure.
    pub async fn create(
        &self,
        post_id: &str,
        author_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let post = self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author_id.to_string()),
            text: Set(input.text.trim().to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment created");
        Ok(comment)
    }

    /// Every comment on a post with its author, oldest first.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<CommentWithAuthor>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id).cloned()?;
                Some(CommentWithAuthor { comment, author })
            })
            .collect())
    }

    /// Count comments on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        self.comment_repo.count_by_post(post_id).await
    }

    /// Count all comments.
    pub async fn count(&self) -> AppResult<u64> {
        self.comment_repo.count().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use yatube_common::AppError;
    use yatube_db::test_utils::TestDatabase;

    fn service(db: &TestDatabase) -> CommentService {
        let conn = db.shared();
        CommentService::new(
            CommentRepository::new(conn.clone()),
            PostRepository::new(conn.clone()),
            UserRepository::new(conn),
        )
    }

    fn input(text: &str) -> CreateCommentInput {
        CreateCommentInput {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = TestDatabase::new().await.unwrap();
        let service = service(&db);
        let author = db.create_user("leo").await.unwrap();
        let reader = db.create_user("anna").await.unwrap();
        let post = db.create_post(&author, "Hello", None).await.unwrap();

        service.create(&post.id, &reader.id, input("First")).await.unwrap();
        service.create(&post.id, &author.id, input("Second")).await.unwrap();

        let comments = service.list_for_post(&post.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.text, "First");
        assert_eq!(comments[0].author.username, "anna");
        assert_eq!(service.count_for_post(&post.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected() {
        let db = TestDatabase::new().await.unwrap();
        let service = service(&db);
        let author = db.create_user("leo").await.unwrap();
        let post = db.create_post(&author, "Hello", None).await.unwrap();

        let result = service.create(&post.id, &author.id, input("  ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_runs_before_post_lookup() {
        let db = TestDatabase::new().await.unwrap();
        let service = service(&db);
        let author = db.create_user("leo").await.unwrap();

        let invalid = service.create("missing", &author.id, input("")).await;
        assert!(matches!(invalid, Err(AppError::Validation(_))));

        let valid = service.create("missing", &author.id, input("Hi")).await;
        assert!(matches!(valid, Err(AppError::PostNotFound(_))));
    }
}
