use axum::{body::Bytes, extract::State, Json};

use crate::dto::auth_dto::{AuthResponse, TelegramAuthRequest};
use crate::error::AuthError;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/auth/telegram",
    request_body = TelegramAuthRequest,
    responses(
        (status = 200, description = "Session issued", body = Json<AuthResponse>),
        (status = 400, description = "no_init_data or no_user_data"),
        (status = 401, description = "invalid_signature"),
        (status = 500, description = "internal_error")
    )
)]
#[axum::debug_handler]
pub async fn telegram_auth(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, AuthError> {
    // An absent or unreadable body is the same as absent init data.
    let request: TelegramAuthRequest = serde_json::from_slice(&body).unwrap_or(TelegramAuthRequest {
        init_data: None,
    });

    let response = state
        .auth_service
        .authenticate(request.init_data.as_deref())
        .await?;
    Ok(Json(response))
}
