use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::post::Post;
use crate::models::user::{NewUser, User, UserUpdate};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>>;

    /// Inserts a user, or returns the existing row if `telegram_id` is taken.
    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Fails with `Error::NotFound` when no user has `telegram_id`.
    async fn update(&self, telegram_id: i64, changes: UserUpdate) -> Result<User>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE telegram_id = $1
            "#,
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, display_name, role, avatar_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (telegram_id) DO UPDATE SET updated_at = users.updated_at
            RETURNING *
            "#,
        )
        .bind(user.telegram_id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(&user.avatar_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update(&self, telegram_id: i64, changes: UserUpdate) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                display_name = COALESCE($5, display_name),
                avatar_url = COALESCE($6, avatar_url),
                role = COALESCE($7, role),
                profile_completed = COALESCE($8, profile_completed),
                updated_at = NOW()
            WHERE telegram_id = $1
            RETURNING *
            "#,
        )
        .bind(telegram_id)
        .bind(&changes.username)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.display_name)
        .bind(&changes.avatar_url)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.profile_completed)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
