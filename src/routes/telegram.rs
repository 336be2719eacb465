use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::services::bot_service::BotCommand;
use crate::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    pub r#type: String,
}

fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".to_string()))
    }
}

#[utoipa::path(
    post,
    path = "/api/webhook/telegram",
    responses(
        (status = 200, description = "Update accepted"),
        (status = 400, description = "Body is not a Telegram update"),
        (status = 401, description = "Webhook secret missing or wrong")
    )
)]
#[axum::debug_handler]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    check_secret(&headers, state.config.telegram_webhook_secret.as_deref())?;
    let update: TelegramUpdate = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("Invalid Telegram update: {}", e)))?;
    tracing::info!("Received Telegram webhook update ID: {}", update.update_id);

    let Some(message) = update.message else {
        return Ok(StatusCode::OK);
    };
    let (Some(text), Some(from)) = (message.text.as_deref(), message.from.as_ref()) else {
        return Ok(StatusCode::OK);
    };
    if from.is_bot {
        return Ok(StatusCode::OK);
    }

    let bot = &state.bot_service;
    let reply = match BotCommand::parse(text) {
        Some(command) => {
            tracing::info!(?command, telegram_id = from.id, "handling bot command");
            bot.reply_for(command, from.id, &from.first_name).await
        }
        None => bot.fallback_reply(),
    };

    // Telegram retries failed deliveries, so a send error must not fail the update.
    if let Err(e) = bot.send_message(message.chat.id, &reply).await {
        tracing::warn!(error = %e, chat_id = message.chat.id, "Failed to send Telegram reply");
    }

    Ok(StatusCode::OK)
}
