//! Caller authentication context
//!
//! The caller's bearer token is pulled out of the `Authorization` header once
//! per request and handed explicitly to every service call that needs to
//! forward it upstream. Token signatures are checked by the gateway in front
//! of this service; here the payload is only read for the audit user name.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;

use crate::ApiError;

/// User name recorded when the token carries no usable claim
pub const UNKNOWN_USER: &str = "unknown";

/// Credentials of the caller for the duration of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    token: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    user_name: Option<String>,
    sub: Option<String>,
}

impl AuthContext {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let username = username_from_token(&token).unwrap_or_else(|| UNKNOWN_USER.to_string());
        Self { token, username }
    }

    /// Raw bearer token, forwarded on upstream calls
    pub fn token(&self) -> &str {
        &self.token
    }

    /// User name used for audit columns
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Read `user_name` (or `sub`) from the JWT payload without verifying it
fn username_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims
        .user_name
        .or(claims.sub)
        .filter(|name| !name.trim().is_empty())
}

/// Token from an `Authorization` value; the scheme name is case-insensitive
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::AccessDenied)?;

        Ok(AuthContext::new(token))
    }
}
