//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite database with every migration applied and
//! small fixture helpers for seeding users, groups and posts.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{group, post, user};
use crate::migrations::Migrator;

/// A throwaway database living as long as this value.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations.
    ///
    /// The pool is pinned to a single connection: every SQLite
    /// `:memory:` connection is a separate database.
    pub async fn new() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.conn.as_ref()
    }

    /// Get a shareable handle to the connection.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Insert a user whose password hash is a placeholder that no
    /// password matches.
    pub async fn create_user(&self, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(next_id()),
            username: Set(username.to_string()),
            username_lower: Set(username.to_lowercase()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            email: Set(format!("{username}@example.com")),
            password_hash: Set("!".to_string()),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.connection())
        .await
    }

    /// Insert a group.
    pub async fn create_group(&self, title: &str, slug: &str) -> Result<group::Model, DbErr> {
        group::ActiveModel {
            id: Set(next_id()),
            title: Set(title.to_string()),
            slug: Set(slug.to_string()),
            description: Set(format!("Description of {title}")),
        }
        .insert(self.connection())
        .await
    }

    /// Insert a post published now.
    pub async fn create_post(
        &self,
        author: &user::Model,
        text: &str,
        group: Option<&group::Model>,
    ) -> Result<post::Model, DbErr> {
        self.create_post_at(author, text, group, Utc::now().into())
            .await
    }

    /// Insert a post with an explicit publication date.
    pub async fn create_post_at(
        &self,
        author: &user::Model,
        text: &str,
        group: Option<&group::Model>,
        created_at: DateTime<FixedOffset>,
    ) -> Result<post::Model, DbErr> {
        post::ActiveModel {
            id: Set(next_id()),
            text: Set(text.to_string()),
            created_at: Set(created_at),
            image: Set(None),
            group_id: Set(group.map(|g| g.id.clone())),
            author_id: Set(author.id.clone()),
        }
        .insert(self.connection())
        .await
    }
}

fn next_id() -> String {
    yatube_common::IdGenerator::new().generate()
}
