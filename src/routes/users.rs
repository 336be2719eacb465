use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::dto::user_dto::{ProfileResponse, RoleUpdateResponse, SelectRolePayload};
use crate::error::{Error, Result};
use crate::models::user::UserRole;
use crate::utils::token::{self, SessionClaims};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = Json<ProfileResponse>),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ProfileResponse>> {
    let user = state.user_service.get_by_telegram_id(claims.telegram_id).await?;
    Ok(Json(ProfileResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/api/users/me/role",
    request_body = SelectRolePayload,
    responses(
        (status = 200, description = "Role stored, fresh token issued", body = Json<RoleUpdateResponse>),
        (status = 400, description = "Unknown role"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Role cannot be self-assigned"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn select_role(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(payload): Json<SelectRolePayload>,
) -> Result<Json<RoleUpdateResponse>> {
    payload.validate()?;
    let role: UserRole = payload.role.parse().map_err(Error::BadRequest)?;

    let user = state
        .user_service
        .select_role(claims.telegram_id, role)
        .await?;

    // The old token still carries the previous role claim.
    let token = token::issue(
        &user.id.to_string(),
        user.telegram_id,
        &user.role,
        &state.config.jwt_secret,
    )
    .map_err(|e| Error::Internal(format!("token issuance failed: {}", e)))?;

    Ok(Json(RoleUpdateResponse {
        user: ProfileResponse::from(user),
        token,
    }))
}
