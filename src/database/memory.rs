use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{PostStore, UserStore};
use crate::error::{Error, Result};
use crate::models::post::Post;
use crate::models::user::{NewUser, User, UserUpdate};
use crate::utils::time::now;

/// Process-local store backing `DATA_SOURCE=demo`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, User>>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            users: RwLock::default(),
            posts: RwLock::new(posts),
        }
    }

    pub fn seeded() -> Self {
        let created = now();
        let samples = [
            (
                "Welcome to TeleBlog Lite",
                "This feed lives inside Telegram. Pick a role in your profile to get started.",
            ),
            (
                "Writing for a small screen",
                "Short paragraphs, one idea each. Readers scroll with a thumb.",
            ),
            (
                "Why Mini Apps",
                "No install, no signup form: Telegram already knows who you are.",
            ),
        ];
        let posts = samples
            .iter()
            .enumerate()
            .map(|(i, (title, content))| Post {
                id: Uuid::new_v4(),
                author_id: None,
                author_name: Some("TeleBlog Team".to_string()),
                title: title.to_string(),
                content: content.to_string(),
                image_url: None,
                created_at: created - Duration::hours(i as i64),
            })
            .collect();
        Self::with_posts(posts)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&telegram_id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        let created = now();
        let record = users.entry(user.telegram_id).or_insert_with(|| User {
            id: Uuid::new_v4(),
            telegram_id: user.telegram_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            display_name: user.display_name,
            role: user.role.as_str().to_string(),
            profile_completed: false,
            avatar_url: user.avatar_url,
            created_at: created,
            updated_at: created,
        });
        Ok(record.clone())
    }

    async fn update(&self, telegram_id: i64, changes: UserUpdate) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&telegram_id)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        if let Some(username) = changes.username {
            user.username = Some(username);
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(display_name) = changes.display_name {
            user.display_name = display_name;
        }
        if let Some(avatar_url) = changes.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(role) = changes.role {
            user.role = role.as_str().to_string();
        }
        if let Some(completed) = changes.profile_completed {
            user.profile_completed = completed;
        }
        user.updated_at = now();

        Ok(user.clone())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>> {
        let mut posts = self.posts.read().await.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn new_user(telegram_id: i64) -> NewUser {
        NewUser {
            telegram_id,
            username: Some("bob".into()),
            first_name: Some("Bob".into()),
            last_name: None,
            display_name: "Bob".into(),
            role: UserRole::Reader,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn insert_twice_returns_the_first_row() {
        let store = MemoryStore::new();
        let first = store.insert(new_user(42)).await.unwrap();
        let mut again = new_user(42);
        again.display_name = "Robert".into();
        let second = store.insert(again).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "Bob");
    }

    #[tokio::test]
    async fn update_only_touches_given_fields() {
        let store = MemoryStore::new();
        store.insert(new_user(42)).await.unwrap();
        let updated = store
            .update(
                42,
                UserUpdate {
                    role: Some(UserRole::Author),
                    profile_completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, "author");
        assert!(updated.profile_completed);
        assert_eq!(updated.username.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update(1, UserUpdate::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn seeded_posts_come_newest_first() {
        let store = MemoryStore::seeded();
        let posts = store.list_recent(2).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].created_at >= posts[1].created_at);
        assert_eq!(posts[0].title, "Welcome to TeleBlog Lite");
    }
}
