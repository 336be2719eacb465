use std::sync::Arc;

use crate::database::store::UserStore;
use crate::error::{Error, Result};
use crate::models::user::{NewUser, User, UserRole, UserUpdate};
use crate::utils::telegram_auth::TelegramIdentity;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Finds the user behind a verified Telegram identity, creating them on
    /// first login and refreshing profile fields Telegram reports as changed.
    pub async fn enroll(&self, identity: &TelegramIdentity) -> Result<User> {
        let Some(existing) = self.store.find_by_telegram_id(identity.id).await? else {
            let user = self
                .store
                .insert(NewUser {
                    telegram_id: identity.id,
                    username: identity.username.clone(),
                    first_name: identity.first_name.clone(),
                    last_name: identity.last_name.clone(),
                    display_name: display_name(identity),
                    role: UserRole::Reader,
                    avatar_url: identity.photo_url.clone(),
                })
                .await?;
            tracing::info!(telegram_id = identity.id, user_id = %user.id, "enrolled new user");
            return Ok(user);
        };

        let changes = profile_changes(&existing, identity);
        if changes.is_empty() {
            return Ok(existing);
        }
        tracing::debug!(telegram_id = identity.id, "refreshing telegram profile fields");
        self.store.update(identity.id, changes).await
    }

    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<User> {
        self.store
            .find_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        self.store.find_by_telegram_id(telegram_id).await
    }

    /// Stores the role the user picked and marks the profile as completed.
    pub async fn select_role(&self, telegram_id: i64, role: UserRole) -> Result<User> {
        if !role.is_self_selectable() {
            return Err(Error::Forbidden(format!(
                "Role `{}` cannot be self-assigned",
                role
            )));
        }

        let user = self
            .store
            .update(
                telegram_id,
                UserUpdate {
                    role: Some(role),
                    profile_completed: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(telegram_id, role = %role, "user selected role");
        Ok(user)
    }
}

pub fn display_name(identity: &TelegramIdentity) -> String {
    let full = [identity.first_name.as_deref(), identity.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return full;
    }

    match identity.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => username.to_string(),
        _ => format!("user{}", identity.id),
    }
}

fn profile_changes(user: &User, identity: &TelegramIdentity) -> UserUpdate {
    fn changed(current: &Option<String>, reported: &Option<String>) -> Option<String> {
        match reported {
            Some(value) if current.as_ref() != Some(value) => Some(value.clone()),
            _ => None,
        }
    }

    let mut changes = UserUpdate {
        username: changed(&user.username, &identity.username),
        first_name: changed(&user.first_name, &identity.first_name),
        last_name: changed(&user.last_name, &identity.last_name),
        avatar_url: changed(&user.avatar_url, &identity.photo_url),
        ..Default::default()
    };
    let names_changed =
        changes.username.is_some() || changes.first_name.is_some() || changes.last_name.is_some();
    // Fields Telegram left out keep their stored values, so the name must too.
    let merged = TelegramIdentity {
        id: identity.id,
        username: identity.username.clone().or_else(|| user.username.clone()),
        first_name: identity.first_name.clone().or_else(|| user.first_name.clone()),
        last_name: identity.last_name.clone().or_else(|| user.last_name.clone()),
        photo_url: None,
    };
    let name = display_name(&merged);
    if names_changed && name != user.display_name {
        changes.display_name = Some(name);
    }
    changes
}
