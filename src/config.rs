use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Where user and post records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Postgres (Supabase) reachable through `DATABASE_URL`.
    Live,
    /// In-process store seeded with sample posts.
    Demo,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Live => "live",
            DataSource::Demo => "demo",
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(DataSource::Live),
            "demo" => Ok(DataSource::Demo),
            other => Err(format!("expected `live` or `demo`, got `{}`", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_address: String,
    pub data_source: DataSource,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub telegram_bot_token: String,
    pub telegram_webhook_secret: Option<String>,
    pub telegram_set_webhook: bool,
    pub webapp_url: String,
    pub init_data_max_age_secs: Option<u64>,
    pub static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let data_source = get_env_parse_or("DATA_SOURCE", DataSource::Live)?;
        let database_url = env::var("DATABASE_URL").ok();
        if data_source == DataSource::Live && database_url.is_none() {
            return Err(Error::Config(
                "Missing environment variable: DATABASE_URL (required when DATA_SOURCE=live)"
                    .to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            data_source,
            database_url,
            jwt_secret: get_env("JWT_SECRET")?,
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            telegram_webhook_secret: env::var("TELEGRAM_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            telegram_set_webhook: get_env_parse_or("TELEGRAM_SET_WEBHOOK", true)?,
            webapp_url: get_env("WEBAPP_URL")?.trim_end_matches('/').to_string(),
            init_data_max_age_secs: get_env_parse_opt("INIT_DATA_MAX_AGE_SECS")?,
            static_dir: env::var("STATIC_DIR").ok().filter(|s| !s.is_empty()),
        })
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/api/webhook/telegram", self.webapp_url)
    }
}

// Secrets never leave the process, not even through logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("data_source", &self.data_source)
            .field("database_url", &self.database_url.as_ref().map(|_| REDACTED))
            .field("jwt_secret", &REDACTED)
            .field("telegram_bot_token", &REDACTED)
            .field(
                "telegram_webhook_secret",
                &self.telegram_webhook_secret.as_ref().map(|_| REDACTED),
            )
            .field("telegram_set_webhook", &self.telegram_set_webhook)
            .field("webapp_url", &self.webapp_url)
            .field("init_data_max_age_secs", &self.init_data_max_age_secs)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_opt<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, raw.trim()).map(Some),
        _ => Ok(None),
    }
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(get_env_parse_opt(name)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server_address: "127.0.0.1:0".into(),
            data_source: DataSource::Demo,
            database_url: Some("postgres://user:pw@db/teleblog".into()),
            jwt_secret: "jwt-secret-value".into(),
            telegram_bot_token: "123:ABC".into(),
            telegram_webhook_secret: Some("hook-secret".into()),
            telegram_set_webhook: false,
            webapp_url: "https://blog.example.com".into(),
            init_data_max_age_secs: None,
            static_dir: None,
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("jwt-secret-value"));
        assert!(!rendered.contains("123:ABC"));
        assert!(!rendered.contains("pw@db"));
        assert!(!rendered.contains("hook-secret"));
        assert!(rendered.contains("https://blog.example.com"));
    }

    #[test]
    fn data_source_parses_case_insensitively() {
        assert_eq!("Demo".parse::<DataSource>(), Ok(DataSource::Demo));
        assert_eq!(" live ".parse::<DataSource>(), Ok(DataSource::Live));
        assert!("mock".parse::<DataSource>().is_err());
    }

    #[test]
    fn webhook_url_is_derived_from_webapp_url() {
        assert_eq!(
            sample().webhook_url(),
            "https://blog.example.com/api/webhook/telegram"
        );
    }
}
