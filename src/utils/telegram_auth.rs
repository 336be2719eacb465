//! Verification of Telegram Mini App launch data.
//!
//! Telegram signs the `initData` query string it hands to a Mini App with a
//! key derived from the bot token:
//!
//! ```text
//! secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! hash       = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))
//! ```
//!
//! where `data_check_string` is every field except `hash`, sorted by key and
//! rendered as `key=value` lines joined with `\n`.
//!
//! See <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>.

use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";

/// The Telegram user embedded in the `user` field of init data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramIdentity {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    #[error("init data is empty")]
    Empty,

    #[error("malformed percent-encoding in `{0}`")]
    MalformedEncoding(String),
}

/// Decoded `key=value` pairs of an init data string, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: Vec<(String, String)>,
}

impl InitData {
    pub fn parse(raw: &str) -> Result<Self, InitDataError> {
        let fields = raw
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
                Ok((decode_component(key)?, decode_component(value)?))
            })
            .collect::<Result<Vec<_>, InitDataError>>()?;

        if fields.is_empty() {
            return Err(InitDataError::Empty);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn hash(&self) -> Option<&str> {
        self.get(HASH_FIELD)
    }

    pub fn auth_date(&self) -> Option<i64> {
        self.get("auth_date")?.parse().ok()
    }

    /// Every field but `hash`, sorted byte-wise by key, as `key=value` lines.
    pub fn data_check_string(&self) -> String {
        let mut pairs: Vec<&(String, String)> =
            self.fields.iter().filter(|(k, _)| k != HASH_FIELD).collect();
        // Stable, so duplicate keys keep their relative order.
        pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Checks `hash` against the signature derived from `bot_token`.
    pub fn verify(&self, bot_token: &str) -> bool {
        let mut hashes = self.fields.iter().filter(|(k, _)| k == HASH_FIELD);
        let (Some((_, received)), None) = (hashes.next(), hashes.next()) else {
            return false;
        };

        match compute_hash(&self.data_check_string(), bot_token) {
            Ok(expected) => expected.as_bytes().ct_eq(received.as_bytes()).into(),
            Err(_) => false,
        }
    }

    /// Whether `auth_date` lies within `max_age_secs` of `now` (Unix seconds).
    pub fn is_fresh(&self, max_age_secs: u64, now: i64) -> bool {
        match self.auth_date() {
            Some(auth_date) => {
                now.saturating_sub(auth_date) <= i64::try_from(max_age_secs).unwrap_or(i64::MAX)
            }
            None => false,
        }
    }

    pub fn identity(&self) -> Option<TelegramIdentity> {
        serde_json::from_str(self.get("user")?).ok()
    }
}

/// Returns `true` only if `init_data` carries a `hash` signed for `bot_token`.
/// Malformed input of any kind yields `false`.
pub fn verify(init_data: &str, bot_token: &str) -> bool {
    match InitData::parse(init_data) {
        Ok(data) => data.verify(bot_token),
        Err(err) => {
            tracing::debug!(error = %err, "unparsable init data");
            false
        }
    }
}

/// Extracts the `user` object without checking the signature.
pub fn parse_identity(init_data: &str) -> Option<TelegramIdentity> {
    InitData::parse(init_data).ok()?.identity()
}

pub fn derive_secret_key(bot_token: &str) -> Result<[u8; 32], hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)?;
    mac.update(bot_token.as_bytes());
    Ok(mac.finalize().into_bytes().into())
}

/// Lowercase hex signature of `data_check_string` for `bot_token`.
pub fn compute_hash(
    data_check_string: &str,
    bot_token: &str,
) -> Result<String, hmac::digest::InvalidLength> {
    let secret_key = derive_secret_key(bot_token)?;
    let mut mac = HmacSha256::new_from_slice(&secret_key)?;
    mac.update(data_check_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a signed init data query string from raw (unencoded) fields, the
/// way the Telegram client would. Used for local development and tests.
pub fn sign_init_data(
    fields: &[(&str, &str)],
    bot_token: &str,
) -> Result<String, hmac::digest::InvalidLength> {
    let encoded: Vec<String> = fields
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, NON_ALPHANUMERIC),
                utf8_percent_encode(v, NON_ALPHANUMERIC)
            )
        })
        .collect();
    let data = InitData {
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    let hash = compute_hash(&data.data_check_string(), bot_token)?;
    Ok(format!("{}&hash={}", encoded.join("&"), hash))
}

fn decode_component(raw: &str) -> Result<String, InitDataError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !well_formed {
                return Err(InitDataError::MalformedEncoding(raw.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| InitDataError::MalformedEncoding(raw.to_string()))
}
