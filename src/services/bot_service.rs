use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::services::{post_service::PostService, user_service::UserService};

const TELEGRAM_API: &str = "https://api.telegram.org";
const FEED_PREVIEW: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Feed,
    Profile,
    Unknown,
}

impl BotCommand {
    /// Reads the leading slash-command of a message, ignoring a `@botname`
    /// suffix and any arguments. Plain text is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let command = word.strip_prefix('/')?;
        let name = command.split('@').next().unwrap_or(command);
        Some(match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "feed" => BotCommand::Feed,
            "profile" => BotCommand::Profile,
            _ => BotCommand::Unknown,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub reply_markup: Option<JsonValue>,
}

impl BotReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_markup: None,
        }
    }
}

const HELP_TEXT: &str = "Available commands:\n\
/start - open TeleBlog\n\
/feed - latest posts\n\
/profile - your role\n\
/help - this message";

#[derive(Clone)]
pub struct BotService {
    http: reqwest::Client,
    bot_token: String,
    webapp_url: String,
    users: UserService,
    posts: PostService,
}

impl BotService {
    pub fn new(
        http: reqwest::Client,
        bot_token: String,
        webapp_url: String,
        users: UserService,
        posts: PostService,
    ) -> Self {
        Self {
            http,
            bot_token,
            webapp_url,
            users,
            posts,
        }
    }

    pub async fn reply_for(
        &self,
        command: BotCommand,
        telegram_id: i64,
        first_name: &str,
    ) -> BotReply {
        match command {
            BotCommand::Start => BotReply {
                text: format!(
                    "Hi {}! TeleBlog Lite is a tiny blog that lives inside Telegram. Tap the button below to open the feed.",
                    first_name
                ),
                reply_markup: Some(json!({
                    "inline_keyboard": [[
                        {
                            "text": "Open TeleBlog",
                            "web_app": { "url": self.webapp_url }
                        }
                    ]]
                })),
            },
            BotCommand::Help => BotReply::text(HELP_TEXT),
            BotCommand::Feed => match self.posts.feed(Some(FEED_PREVIEW)).await {
                Ok(posts) if posts.is_empty() => BotReply::text("No posts yet. Check back soon!"),
                Ok(posts) => {
                    let lines = posts
                        .iter()
                        .enumerate()
                        .map(|(i, post)| format!("{}. {}", i + 1, post.title))
                        .collect::<Vec<_>>()
                        .join("\n");
                    BotReply::text(format!("Latest posts:\n{}", lines))
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to load feed for bot");
                    BotReply::text("The feed is unavailable right now, please try again later.")
                }
            },
            BotCommand::Profile => match self.users.find_by_telegram_id(telegram_id).await {
                Ok(Some(user)) => {
                    let status = if user.profile_completed {
                        "completed"
                    } else {
                        "not completed yet, pick a role in the app"
                    };
                    BotReply::text(format!(
                        "{}\nRole: {}\nProfile: {}",
                        user.display_name, user.role, status
                    ))
                }
                Ok(None) => BotReply::text("You have not opened TeleBlog yet. Send /start to begin."),
                Err(e) => {
                    tracing::error!(error = %e, telegram_id, "failed to load profile for bot");
                    BotReply::text("Your profile is unavailable right now, please try again later.")
                }
            },
            BotCommand::Unknown => BotReply::text("Unknown command. Send /help to see what I can do."),
        }
    }

    /// Reply for a message that is not a command.
    pub fn fallback_reply(&self) -> BotReply {
        BotReply::text("To open the blog, use the /start command. Send /help for more.")
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API, self.bot_token, method)
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        // Bot API URLs embed the token; strip them before the error can be logged.
        request.send().await.map_err(without_url)
    }

    pub async fn send_message(&self, chat_id: i64, reply: &BotReply) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": reply.text,
        });
        if let Some(markup) = &reply.reply_markup {
            body["reply_markup"] = markup.clone();
        }

        let response = self
            .call(self.http.post(self.api_url("sendMessage")).json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "sendMessage returned {}: {}",
                status, detail
            )));
        }
        tracing::debug!(chat_id, "telegram message sent");
        Ok(())
    }

    /// Points the bot's webhook at `target_url` and hands Telegram the
    /// current `secret`.
    pub async fn ensure_webhook(&self, target_url: &str, secret: Option<&str>) -> Result<()> {
        let info: JsonValue = self
            .call(self.http.get(self.api_url("getWebhookInfo")))
            .await?
            .json()
            .await
            .map_err(without_url)?;
        let current_url = info["result"]["url"].as_str().unwrap_or("");

        if !webhook_needs_update(current_url, target_url, secret) {
            tracing::info!("Telegram webhook is already up to date: {}", current_url);
            return Ok(());
        }

        tracing::info!("Updating Telegram webhook: {} -> {}", current_url, target_url);
        let mut body = json!({ "url": target_url });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        let response = self
            .call(self.http.post(self.api_url("setWebhook")).json(&body))
            .await?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "setWebhook returned {}",
                response.status()
            )));
        }
        tracing::info!("Telegram webhook registered successfully");
        Ok(())
    }
}

fn without_url(err: reqwest::Error) -> Error {
    Error::Reqwest(err.without_url())
}

/// `getWebhookInfo` never reports the secret token, so a configured secret
/// is always re-sent.
fn webhook_needs_update(current_url: &str, target_url: &str, secret: Option<&str>) -> bool {
    current_url != target_url || secret.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::user::UserRole;
    use crate::utils::telegram_auth::TelegramIdentity;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(store: Arc<MemoryStore>) -> BotService {
        BotService::new(
            reqwest::Client::new(),
            "123:ABC".into(),
            "https://blog.example.com".into(),
            UserService::new(store.clone()),
            PostService::new(store),
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/start ref_123"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/Feed@teleblog_bot"), Some(BotCommand::Feed));
        assert_eq!(BotCommand::parse("  /profile"), Some(BotCommand::Profile));
        assert_eq!(BotCommand::parse("/help"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("/dance"), Some(BotCommand::Unknown));
        assert_eq!(BotCommand::parse("hello /start"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[tokio::test]
    async fn start_offers_web_app_button() {
        let reply = service(Arc::new(MemoryStore::new()))
            .reply_for(BotCommand::Start, 42, "Bob")
            .await;
        assert!(reply.text.contains("Bob"));
        let markup = reply.reply_markup.unwrap();
        assert_eq!(
            markup["inline_keyboard"][0][0]["web_app"]["url"],
            "https://blog.example.com"
        );
    }

    #[tokio::test]
    async fn feed_lists_titles_or_says_empty() {
        let empty = service(Arc::new(MemoryStore::new()))
            .reply_for(BotCommand::Feed, 42, "Bob")
            .await;
        assert_eq!(empty.text, "No posts yet. Check back soon!");

        let seeded = service(Arc::new(MemoryStore::seeded()))
            .reply_for(BotCommand::Feed, 42, "Bob")
            .await;
        assert!(seeded.text.starts_with("Latest posts:\n1. Welcome to TeleBlog Lite"));
    }

    #[tokio::test]
    async fn profile_reports_role() {
        let store = Arc::new(MemoryStore::new());
        let bot = service(store.clone());

        let unknown = bot.reply_for(BotCommand::Profile, 42, "Bob").await;
        assert!(unknown.text.contains("/start"));

        let users = UserService::new(store);
        users
            .enroll(&TelegramIdentity {
                id: 42,
                username: None,
                first_name: Some("Bob".into()),
                last_name: None,
                photo_url: None,
            })
            .await
            .unwrap();
        users.select_role(42, UserRole::Author).await.unwrap();

        let known = bot.reply_for(BotCommand::Profile, 42, "Bob").await;
        assert_eq!(known.text, "Bob\nRole: author\nProfile: completed");
    }

    #[test]
    fn webhook_is_reregistered_when_a_secret_is_configured() {
        let target = "https://blog.example.com/api/webhook/telegram";
        assert!(!webhook_needs_update(target, target, None));
        assert!(webhook_needs_update(target, target, Some("s")));
        assert!(webhook_needs_update("", target, None));
        assert!(webhook_needs_update("https://old.example.com/hook", target, Some("s")));
    }

    #[tokio::test]
    async fn failed_requests_do_not_expose_the_bot_token() {
        let token = "123456:SECRET-BOT-TOKEN";
        let http = reqwest::Client::builder()
            .timeout(Duration::from_nanos(1))
            .build()
            .unwrap();
        let store = Arc::new(MemoryStore::new());
        let bot = BotService::new(
            http,
            token.into(),
            "https://blog.example.com".into(),
            UserService::new(store.clone()),
            PostService::new(store),
        );

        let err = bot
            .send_message(42, &BotReply::text("hi"))
            .await
            .unwrap_err();
        assert!(!err.to_string().contains(token));
        assert!(!format!("{:?}", err).contains(token));

        let err = bot
            .ensure_webhook("https://blog.example.com/api/webhook/telegram", None)
            .await
            .unwrap_err();
        assert!(!err.to_string().contains(token));
        assert!(!format!("{:?}", err).contains(token));
    }
}
