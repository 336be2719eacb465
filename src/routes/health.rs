use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::database::StoreStatus;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store is ready"),
        (status = 503, description = "Store is not ready")
    )
)]
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.backend.status();
    let (status, label) = match store {
        StoreStatus::Ready => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };
    let body = json!({
        "status": label,
        "data_source": state.backend.source().as_str(),
        "store": store,
    });
    (status, Json(body))
}
