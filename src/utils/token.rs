//! Session tokens handed to the Mini App after a successful Telegram login.
//!
//! Tokens are compact HS256 JWTs minted by hand so that the header and claim
//! layout is exactly `{"alg":"HS256","typ":"JWT"}` and
//! `{"sub","telegram_id","role","iat","exp"}`. They are validated with
//! `jsonwebtoken` in the bearer middleware.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub telegram_id: i64,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    EmptySecret,

    #[error("invalid signing key: {0}")]
    Key(#[from] hmac::digest::InvalidLength),

    #[error("failed to encode token segment: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn issue(
    user_id: &str,
    telegram_id: i64,
    role: &str,
    secret: &str,
) -> Result<String, TokenError> {
    issue_at(user_id, telegram_id, role, secret, crate::utils::time::unix_now())
}

/// Mints a token as if the current time were `now` (Unix seconds).
pub fn issue_at(
    user_id: &str,
    telegram_id: i64,
    role: &str,
    secret: &str,
    now: i64,
) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::EmptySecret);
    }

    let claims = SessionClaims {
        sub: user_id.to_string(),
        telegram_id,
        role: role.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&TokenHeader::default())?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let signing_input = format!("{}.{}", header, payload);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    const SECRET: &str = "test_secret_key";

    fn segment(token: &str, idx: usize) -> Vec<u8> {
        let part = token.split('.').nth(idx).unwrap();
        URL_SAFE_NO_PAD.decode(part).unwrap()
    }

    #[test]
    fn segments_decode_to_exact_json() {
        let token = issue_at("5b0c2c1e-user", 42, "reader", SECRET, 1_700_000_000).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));

        assert_eq!(
            String::from_utf8(segment(&token, 0)).unwrap(),
            r#"{"alg":"HS256","typ":"JWT"}"#
        );
        assert_eq!(
            String::from_utf8(segment(&token, 1)).unwrap(),
            r#"{"sub":"5b0c2c1e-user","telegram_id":42,"role":"reader","iat":1700000000,"exp":1700086400}"#
        );
    }

    #[test]
    fn expiry_is_one_day_after_issue() {
        let token = issue("u-1", 7, "author", SECRET).unwrap();
        let claims: SessionClaims = serde_json::from_slice(&segment(&token, 1)).unwrap();
        assert_eq!(claims.exp, claims.iat + 86400);
    }

    #[test]
    fn signature_covers_header_and_payload() {
        let token = issue_at("u-1", 7, "author", SECRET, 1_700_000_000).unwrap();
        let (signing_input, _) = token.rsplit_once('.').unwrap();

        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        assert_eq!(segment(&token, 2), mac.finalize().into_bytes().to_vec());
    }

    #[test]
    fn tokens_a_second_apart_differ_and_both_validate() {
        let now = chrono::Utc::now().timestamp();
        let first = issue_at("u-1", 7, "reader", SECRET, now).unwrap();
        let second = issue_at("u-1", 7, "reader", SECRET, now + 1).unwrap();
        assert_ne!(first, second);

        let validation = Validation::new(Algorithm::HS256);
        for token in [&first, &second] {
            let data = decode::<SessionClaims>(
                token,
                &DecodingKey::from_secret(SECRET.as_bytes()),
                &validation,
            )
            .unwrap();
            assert_eq!(data.claims.sub, "u-1");
            assert_eq!(data.claims.telegram_id, 7);
        }
    }

    #[test]
    fn other_secret_does_not_validate() {
        let token = issue("u-1", 7, "reader", SECRET).unwrap();
        let result = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(b"another_secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_secret_is_an_error() {
        assert!(matches!(
            issue("u-1", 7, "reader", ""),
            Err(TokenError::EmptySecret)
        ));
    }
}
