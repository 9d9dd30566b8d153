//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an ApiError,
//! use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::ApiError;

lazy_static! {
    /// Letters, digits, dot, dash and underscore; must start with a letter or digit
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_REVIEW_LEN: usize = 5000;

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 2 {
        return Err("Username is too short (min 2 characters)".to_string());
    }

    if username.len() > 32 {
        return Err("Username is too long (max 32 characters)".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username may only contain letters, digits, '.', '-' and '_'".to_string(),
        );
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    if password.len() > 256 {
        return Err("Password is too long (max 256 characters)".to_string());
    }

    Ok(())
}

/// Validate a review message
pub fn validate_review_message(message: &str) -> Result<(), String> {
    if message.trim().is_empty() {
        return Err("Review message is required".to_string());
    }

    if message.chars().count() > MAX_REVIEW_LEN {
        return Err(format!(
            "Review message is too long (max {} characters)",
            MAX_REVIEW_LEN
        ));
    }

    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}

/// Validate a path id, mapping failure to a field validation error
pub fn require_uuid(id: &str, field_name: &str) -> Result<(), ApiError> {
    validate_uuid(id, field_name).map_err(|e| ApiError::validation_field(field_name, e))
}
