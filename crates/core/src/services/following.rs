//! Following service.

use sea_orm::Set;
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{entities::follow, repositories::FollowRepository};

/// Outcome of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    /// A new edge was stored.
    Created,
    /// The edge already existed.
    AlreadyFollowing,
    /// Users cannot follow themselves; nothing was stored.
    SelfFollow,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    follow_repo: FollowRepository,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository) -> Self {
        Self {
            follow_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow an author (get-or-create).
    pub async fn follow(&self, user_id: &str, author_id: &str) -> AppResult<FollowResult> {
        if user_id == author_id {
            return Ok(FollowResult::SelfFollow);
        }

        if self.follow_repo.is_following(user_id, author_id).await? {
            return Ok(FollowResult::AlreadyFollowing);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            author_id: Set(author_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        match self.follow_repo.create(model).await {
            Ok(_) => {
                tracing::info!(user_id = %user_id, author_id = %author_id, "Followed");
                Ok(FollowResult::Created)
            }
            // Lost a race with a concurrent identical request.
            Err(AppError::Conflict(_)) => Ok(FollowResult::AlreadyFollowing),
            Err(e) => Err(e),
        }
    }

    /// Stop following an author. Fails with `NotFound` when not following.
    pub async fn unfollow(&self, user_id: &str, author_id: &str) -> AppResult<()> {
        let edge = self
            .follow_repo
            .find_by_pair(user_id, author_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Follow relationship".to_string()))?;

        self.follow_repo.delete(edge).await?;
        tracing::info!(user_id = %user_id, author_id = %author_id, "Unfollowed");
        Ok(())
    }

    /// Check if a user follows an author.
    pub async fn is_following(&self, user_id: &str, author_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(user_id, author_id).await
    }

    /// Count the followers of an author.
    pub async fn count_followers(&self, author_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(author_id).await
    }

    /// Count the authors a user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use yatube_db::test_utils::TestDatabase;

    #[tokio::test]
    async fn test_follow_self_stores_nothing() {
        // No queries expected.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = FollowingService::new(FollowRepository::new(db));

        let result = service.follow("user1", "user1").await.unwrap();
        assert_eq!(result, FollowResult::SelfFollow);
    }

    #[tokio::test]
    async fn test_follow_existing_edge() {
        let edge = follow::Model {
            id: "f1".to_string(),
            user_id: "user1".to_string(),
            author_id: "user2".to_string(),
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge]])
                .into_connection(),
        );
        let service = FollowingService::new(FollowRepository::new(db));

        let result = service.follow("user1", "user2").await.unwrap();
        assert_eq!(result, FollowResult::AlreadyFollowing);
    }

    #[tokio::test]
    async fn test_follow_then_unfollow() {
        let db = TestDatabase::new().await.unwrap();
        let service = FollowingService::new(FollowRepository::new(db.shared()));
        let reader = db.create_user("reader").await.unwrap();
        let author = db.create_user("author").await.unwrap();

        assert_eq!(
            service.follow(&reader.id, &author.id).await.unwrap(),
            FollowResult::Created
        );
        assert_eq!(
            service.follow(&reader.id, &author.id).await.unwrap(),
            FollowResult::AlreadyFollowing
        );
        assert!(service.is_following(&reader.id, &author.id).await.unwrap());
        assert_eq!(service.count_followers(&author.id).await.unwrap(), 1);

        service.unfollow(&reader.id, &author.id).await.unwrap();
        assert!(!service.is_following(&reader.id, &author.id).await.unwrap());

        assert!(matches!(
            service.unfollow(&reader.id, &author.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
