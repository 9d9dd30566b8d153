use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use lazy_static::lazy_static;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::{find_user_by_token, User};
use crate::AppState;

use super::error::ApiError;

pub const LOGIN_REQUIRED: &str = "Please log in";

lazy_static! {
    /// Hash checked against when a login names no existing user
    static ref DUMMY_HASH: Option<String> = hash_password("gamecritic-unknown-user").ok();
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Run a full password verification for a login whose username matched
/// nobody. Always false.
pub fn verify_unknown_user(password: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_ref() {
        let _ = verify_password(password, hash);
    }
    false
}

/// Generate a random access token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Extract the token from the Authorization header. The raw header value is
/// the token; a `Bearer ` prefix is accepted and stripped.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolve the user owning a token
pub async fn get_current_user(pool: &sqlx::SqlitePool, token: &str) -> Result<User, ApiError> {
    let user = find_user_by_token(pool, token).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to look up access token");
        ApiError::internal("Could not authenticate user")
    })?;

    user.ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))
}

/// Allow the request if it carries the configured admin token. When no admin
/// token is configured any authenticated user is accepted.
pub async fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = extract_token(headers).ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;

    match &state.config.auth.admin_token {
        Some(admin_token) => {
            let expected = admin_token.as_bytes();
            let provided = token.as_bytes();
            // Only compare if lengths match (constant-time check)
            if expected.len() == provided.len() && bool::from(expected.ct_eq(provided)) {
                Ok(())
            } else {
                Err(ApiError::forbidden("Admin token required"))
            }
        }
        None => get_current_user(&state.db, token).await.map(|_| ()),
    }
}

/// Only the user themselves may act on their account or content when
/// ownership is enforced
pub fn ensure_owner(state: &AppState, user: &User, owner_id: &str) -> Result<(), ApiError> {
    if state.config.auth.enforce_ownership && user.id != owner_id {
        return Err(ApiError::forbidden("You can only modify your own resources"));
    }
    Ok(())
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;
        get_current_user(&state.db, token).await
    }
}
