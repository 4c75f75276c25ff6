// src/auth.rs
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::session::User;
use crate::summary::username_from_email;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("Please enter your email first")]
    EmptyEmail,
    #[error("identity token is malformed: {0}")]
    Malformed(String),
    #[error("identity token expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("identity token carries no email")]
    MissingEmail,
}

/// Display fields carried in the identity token payload.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentityClaims {
    pub email: Option<String>,
    pub picture: Option<String>,
    pub exp: Option<i64>,
}

/// Reads the payload of a `header.payload.signature` token. The signature is not checked.
pub fn decode_identity_token(token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, AuthError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::Malformed(format!("expected 3 segments, found {}", segments.len())));
    }
    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| AuthError::Malformed(e.to_string()))?;
    let claims: IdentityClaims =
        serde_json::from_slice(&payload).map_err(|e| AuthError::Malformed(e.to_string()))?;

    if let Some(exp) = claims.exp {
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::Malformed(format!("exp out of range: {}", exp)))?;
        if expires_at <= now {
            return Err(AuthError::Expired(expires_at));
        }
    }
    if claims.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
        return Err(AuthError::MissingEmail);
    }
    Ok(claims)
}

pub fn validate_login_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::EmptyEmail);
    }
    Ok(email.to_string())
}

pub fn user_from_email(email: &str, credits: u32) -> Result<User, AuthError> {
    let email = validate_login_email(email)?;
    Ok(User::new(username_from_email(&email), email, credits))
}

pub fn user_from_token(token: &str, credits: u32, now: DateTime<Utc>) -> Result<User, AuthError> {
    let claims = decode_identity_token(token, now)?;
    let email = claims.email.unwrap_or_default();
    let mut user = User::new(username_from_email(&email), email, credits);
    user.profile_pic = claims.picture;
    user.credential = Some(token.trim().to_string());
    Ok(user)
}

#[cfg(test)]
pub(crate) fn make_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_display_fields() {
        let now = Utc::now();
        let token = make_token(&json!({
            "email": "grace@example.com",
            "picture": "https://pics.example.com/grace.png",
            "exp": now.timestamp() + 3600,
        }));
        let user = user_from_token(&token, 100, now).unwrap();
        assert_eq!(user.username, "grace");
        assert_eq!(user.profile_pic.as_deref(), Some("https://pics.example.com/grace.png"));
        assert_eq!(user.credential.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn rejects_expired_tokens() {
        let now = Utc::now();
        let token = make_token(&json!({"email": "a@b.c", "exp": now.timestamp() - 1}));
        assert!(matches!(decode_identity_token(&token, now), Err(AuthError::Expired(_))));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let now = Utc::now();
        assert!(matches!(decode_identity_token("not-a-token", now), Err(AuthError::Malformed(_))));
        assert!(matches!(decode_identity_token("a.%%%.c", now), Err(AuthError::Malformed(_))));
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("plain text"));
        assert!(matches!(decode_identity_token(&not_json, now), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn requires_an_email_claim() {
        let token = make_token(&json!({"name": "Nobody"}));
        assert_eq!(decode_identity_token(&token, Utc::now()), Err(AuthError::MissingEmail));
    }

    #[test]
    fn blank_email_is_rejected_with_inline_message() {
        let err = user_from_email("   ", 100).unwrap_err();
        assert_eq!(err.to_string(), "Please enter your email first");
        assert_eq!(user_from_email(" ada@example.com ", 100).unwrap().email, "ada@example.com");
    }
}
