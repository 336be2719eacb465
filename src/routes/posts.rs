use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::post_dto::{FeedQuery, FeedResponse};
use crate::error::Result;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/posts",
    params(
        ("limit" = Option<i64>, Query, description = "Number of posts, 1..=50, default 20")
    ),
    responses(
        (status = 200, description = "Newest posts first", body = Json<FeedResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let posts = state.post_service.feed(query.limit).await?;
    Ok(Json(FeedResponse::from(posts)))
}
