use std::sync::Arc;

use crate::database::store::PostStore;
use crate::error::Result;
use crate::models::post::Post;

pub const DEFAULT_FEED_LIMIT: i64 = 20;
pub const MAX_FEED_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub async fn feed(&self, limit: Option<i64>) -> Result<Vec<Post>> {
        let limit = limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT);
        self.store.list_recent(limit).await
    }
}
