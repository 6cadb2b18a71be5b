//! Group service.

use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError};
use yatube_common::{AppError, AppResult, IdGenerator};
use yatube_db::{entities::group, repositories::GroupRepository};

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    id_gen: IdGenerator,
}

/// Input for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: String,

    #[serde(default)]
    pub description: String,
}

/// Letters, digits, hyphens and underscores only.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_slug");
        err.message = Some(
            "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens."
                .into(),
        );
        Err(err)
    }
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(group_repo: GroupRepository) -> Self {
        Self {
            group_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a group by slug.
    pub async fn get_by_slug(&self, slug: &str) -> AppResult<group::Model> {
        self.group_repo.get_by_slug(slug).await
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        self.group_repo.find_by_id(id).await
    }

    /// All groups ordered by title.
    pub async fn list(&self) -> AppResult<Vec<group::Model>> {
        self.group_repo.find_all().await
    }

    /// Create a group. The slug cannot be changed afterwards.
    pub async fn create(&self, input: CreateGroupInput) -> AppResult<group::Model> {
        input.validate()?;

        if self.group_repo.find_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Conflict(
                "Group with this slug already exists.".to_string(),
            ));
        }

        let model = group::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title.trim().to_string()),
            slug: Set(input.slug),
            description: Set(input.description),
        };

        let group = self.group_repo.create(model).await?;
        tracing::info!(group_id = %group.id, slug = %group.slug, "Group created");
        Ok(group)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use yatube_db::test_utils::TestDatabase;

    fn input(slug: &str) -> CreateGroupInput {
        CreateGroupInput {
            title: "Cats".to_string(),
            slug: slug.to_string(),
            description: "All about cats".to_string(),
        }
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("cats_and-dogs2").is_ok());
        assert!(validate_slug("cats and dogs").is_err());
        assert!(validate_slug("коты").is_err());
        assert!(validate_slug("").is_err());
    }

    #[tokio::test]
    async fn test_create_and_get_by_slug() {
        let db = TestDatabase::new().await.unwrap();
        let service = GroupService::new(GroupRepository::new(db.shared()));

        let group = service.create(input("cats")).await.unwrap();
        let found = service.get_by_slug("cats").await.unwrap();

        assert_eq!(found.id, group.id);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let db = TestDatabase::new().await.unwrap();
        let service = GroupService::new(GroupRepository::new(db.shared()));

        service.create(input("cats")).await.unwrap();
        assert!(matches!(
            service.create(input("cats")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_slug_is_not_found() {
        let db = TestDatabase::new().await.unwrap();
        let service = GroupService::new(GroupRepository::new(db.shared()));

        assert!(matches!(
            service.get_by_slug("nope").await,
            Err(AppError::GroupNotFound(_))
        ));
    }
}
