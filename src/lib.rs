pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::Backend;
use crate::error::Result;
use crate::services::{
    auth_service::AuthService, bot_service::BotService, post_service::PostService,
    user_service::UserService,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Backend,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub post_service: PostService,
    pub bot_service: BotService,
}

impl AppState {
    pub fn new(config: Arc<Config>, backend: Backend) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        let user_service = UserService::new(backend.users());
        let post_service = PostService::new(backend.posts());
        let auth_service = AuthService::new(config.clone(), user_service.clone());
        let bot_service = BotService::new(
            http_client,
            config.telegram_bot_token.clone(),
            config.webapp_url.clone(),
            user_service.clone(),
            post_service.clone(),
        );

        Ok(Self {
            config,
            backend,
            auth_service,
            user_service,
            post_service,
            bot_service,
        })
    }
}
