use serde::{Deserialize, Serialize};

use crate::models::post::Post;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub items: Vec<Post>,
    pub total: usize,
}

impl From<Vec<Post>> for FeedResponse {
    fn from(items: Vec<Post>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}
