//! Registration, login and user account endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{
    self, AuthResponse, CredentialsRequest, ReviewResponse, UpdateUserRequest, User, UserProfile,
};
use crate::AppState;

use super::auth::{
    ensure_owner, generate_token, hash_password, verify_password, verify_unknown_user,
};
use super::envelope::Envelope;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{require_uuid, validate_password, validate_username};

const CREDENTIALS_MISMATCH: &str = "Credentials do not match";

fn auth_response(user: User, reviews: Vec<String>) -> AuthResponse {
    AuthResponse {
        id: user.id,
        username: user.username,
        access_token: user.access_token,
        created_at: user.created_at,
        reviews,
    }
}

fn hash_or_500(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to hash password")
    })
}

/// Register a new user
///
/// POST /users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Envelope<AuthResponse>), ApiError> {
    let Json(req) = payload?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_username(&req.username) {
        errors.add("username", e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.add("password", e);
    }
    errors.finish()?;

    let password_hash = hash_or_500(&req.password)?;
    let token = generate_token();

    let user = db::insert_user(&state.db, &req.username, &password_hash, &token)
        .await
        .map_err(|e| match ApiError::from(e) {
            err if err.status() == StatusCode::CONFLICT => {
                ApiError::conflict("Username is already taken")
            }
            err => err,
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(Envelope::ok(auth_response(user, Vec::new())).status(StatusCode::CREATED))
}

/// Log in with username and password, returning the access token issued at
/// registration
///
/// POST /users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Envelope<AuthResponse>, ApiError> {
    let Json(req) = payload?;

    let Some(user) = db::find_user_by_username(&state.db, &req.username).await? else {
        // Same argon2 cost as a real check so unknown names don't answer faster
        verify_unknown_user(&req.password);
        return Err(ApiError::unauthorized(CREDENTIALS_MISMATCH));
    };

    if !verify_password(&req.password, &user.password_hash) {
        tracing::debug!(username = %req.username, "Rejected login with wrong password");
        return Err(ApiError::unauthorized(CREDENTIALS_MISMATCH));
    }

    let reviews = db::list_user_review_ids(&state.db, &user.id).await?;
    Ok(Envelope::ok(auth_response(user, reviews)))
}

/// List all users
///
/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Envelope<Vec<UserProfile>>, ApiError> {
    let users = db::list_user_profiles(&state.db).await?;
    Ok(Envelope::list(users, "There are no users"))
}

/// Get one user's public profile
///
/// GET /users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<UserProfile>, ApiError> {
    require_uuid(&id, "user_id")?;

    let profile = db::get_user_profile(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Envelope::ok(profile))
}

/// Change username and/or password
///
/// PATCH /users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Envelope<UserProfile>, ApiError> {
    require_uuid(&id, "user_id")?;
    let Json(req) = payload?;

    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref username) = req.username {
        if let Err(e) = validate_username(username) {
            errors.add("username", e);
        }
    }
    if let Some(ref password) = req.password {
        if let Err(e) = validate_password(password) {
            errors.add("password", e);
        }
    }
    if req.username.is_none() && req.password.is_none() {
        errors.add("body", "Nothing to update");
    }
    errors.finish()?;

    if db::find_user(&state.db, &id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    ensure_owner(&state, &caller, &id)?;

    let password_hash = req.password.as_deref().map(hash_or_500).transpose()?;

    let updated = db::update_user(
        &state.db,
        &id,
        req.username.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        err if err.status() == StatusCode::CONFLICT => {
            ApiError::conflict("Username is already taken")
        }
        err => err,
    })?;

    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    let profile = db::get_user_profile(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(user_id = %id, updated_by = %caller.id, "User updated");
    Ok(Envelope::ok(profile))
}

/// Delete a user along with their reviews and collections
///
/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(id): Path<String>,
) -> Result<Envelope<UserProfile>, ApiError> {
    require_uuid(&id, "user_id")?;

    let profile = db::get_user_profile(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    ensure_owner(&state, &caller, &id)?;

    if !db::delete_user(&state.db, &id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %id, deleted_by = %caller.id, "User deleted");
    Ok(Envelope::ok(profile).with_message("User deleted"))
}

/// Reviews written by one user
///
/// GET /users/:id/reviews
pub async fn list_user_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<Vec<ReviewResponse>>, ApiError> {
    require_uuid(&id, "user_id")?;

    let reviews = db::list_reviews_by_user(&state.db, &id).await?;
    let reviews = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Envelope::list(reviews, "This user has not posted any reviews"))
}
