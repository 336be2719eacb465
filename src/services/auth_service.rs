use std::sync::Arc;

use crate::config::Config;
use crate::dto::auth_dto::AuthResponse;
use crate::error::AuthError;
use crate::services::user_service::UserService;
use crate::utils::telegram_auth::InitData;
use crate::utils::{time, token};

/// Exchanges Telegram launch data for a session token.
#[derive(Clone)]
pub struct AuthService {
    config: Arc<Config>,
    users: UserService,
}

impl AuthService {
    pub fn new(config: Arc<Config>, users: UserService) -> Self {
        Self { config, users }
    }

    pub async fn authenticate(&self, init_data: Option<&str>) -> Result<AuthResponse, AuthError> {
        let raw = init_data
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or(AuthError::NoInitData)?;

        let data = match InitData::parse(raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting unparsable init data");
                return Err(AuthError::InvalidSignature);
            }
        };

        if !data.verify(&self.config.telegram_bot_token) {
            tracing::warn!("init data signature mismatch");
            return Err(AuthError::InvalidSignature);
        }

        if let Some(max_age) = self.config.init_data_max_age_secs {
            if !data.is_fresh(max_age, time::unix_now()) {
                tracing::warn!(auth_date = ?data.auth_date(), max_age, "init data expired");
                return Err(AuthError::InvalidSignature);
            }
        }

        let identity = data.identity().ok_or(AuthError::NoUserData)?;

        let user = self
            .users
            .enroll(&identity)
            .await
            .map_err(|e| AuthError::Internal(format!("enrollment failed: {}", e)))?;

        let token = token::issue(
            &user.id.to_string(),
            user.telegram_id,
            &user.role,
            &self.config.jwt_secret,
        )
        .map_err(|e| AuthError::Internal(format!("token issuance failed: {}", e)))?;

        tracing::info!(telegram_id = user.telegram_id, role = %user.role, "issued session token");
        Ok(AuthResponse {
            user: user.into(),
            token,
        })
    }
}
