pub mod auth;
pub mod health;
pub mod posts;
pub mod telegram;
pub mod users;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{auth::require_session, cors::webapp_cors};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/telegram", post(auth::telegram_auth))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/webhook/telegram", post(telegram::handle_webhook));

    let session_api = Router::new()
        .route("/api/users/me", get(users::get_me))
        .route("/api/users/me/role", patch(users::select_role))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let mut app = public_api.merge(session_api);
    if let Some(dir) = &state.config.static_dir {
        tracing::info!("Serving Mini App from: {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }

    let cors = webapp_cors(&state.config.webapp_url);
    app.with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
