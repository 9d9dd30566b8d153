//! Review endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::db::{self, CreateReviewRequest, ReviewResponse, UpdateReviewRequest, User};
use crate::AppState;

use super::auth::ensure_owner;
use super::envelope::Envelope;
use super::error::ApiError;
use super::validation::{require_uuid, validate_review_message};

async fn load_review(state: &AppState, id: &str) -> Result<ReviewResponse, ApiError> {
    db::find_review(&state.db, id)
        .await?
        .map(ReviewResponse::from)
        .ok_or_else(|| ApiError::not_found("Review not found"))
}

/// List all reviews, newest first
///
/// GET /reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
) -> Result<Envelope<Vec<ReviewResponse>>, ApiError> {
    let reviews = db::list_reviews(&state.db).await?;
    let reviews = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Envelope::list(reviews, "There are no reviews"))
}

/// GET /reviews/:id
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<ReviewResponse>, ApiError> {
    require_uuid(&id, "review_id")?;
    Ok(Envelope::ok(load_review(&state, &id).await?))
}

/// Reviews for one game
///
/// GET /games/:id/reviews
pub async fn list_game_reviews(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Envelope<Vec<ReviewResponse>>, ApiError> {
    require_uuid(&game_id, "game_id")?;

    if db::find_game(&state.db, &game_id).await?.is_none() {
        return Err(ApiError::not_found("Game not found"));
    }

    let reviews = db::list_reviews_for_game(&state.db, &game_id).await?;
    let reviews = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(Envelope::list(reviews, "This game has no reviews"))
}

/// Post a review of a game as the calling user
///
/// POST /games/:id/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(game_id): Path<String>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Envelope<ReviewResponse>), ApiError> {
    require_uuid(&game_id, "game_id")?;
    let Json(req) = payload?;

    validate_review_message(&req.message)
        .map_err(|e| ApiError::validation_field("message", e))?;

    let game = db::find_game(&state.db, &game_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    let id = db::insert_review(&state.db, &caller.id, &game.id, &game.name, req.message.trim())
        .await?;

    tracing::info!(review_id = %id, game_id = %game.id, user_id = %caller.id, "Review posted");

    let review = load_review(&state, &id).await?;
    Ok(Envelope::ok(review).status(StatusCode::CREATED))
}

/// Edit a review's message
///
/// PATCH /reviews/:id
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(id): Path<String>,
    payload: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Envelope<ReviewResponse>, ApiError> {
    require_uuid(&id, "review_id")?;
    let Json(req) = payload?;

    let message = req.message.unwrap_or_default();
    validate_review_message(&message).map_err(|e| ApiError::validation_field("message", e))?;

    let existing = load_review(&state, &id).await?;
    ensure_owner(&state, &caller, &existing.user.id)?;

    if !db::update_review_message(&state.db, &id, message.trim()).await? {
        return Err(ApiError::not_found("Review not found"));
    }

    tracing::info!(review_id = %id, user_id = %caller.id, "Review updated");
    Ok(Envelope::ok(load_review(&state, &id).await?))
}

/// Delete a review, returning it
///
/// DELETE /reviews/:id
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(id): Path<String>,
) -> Result<Envelope<ReviewResponse>, ApiError> {
    require_uuid(&id, "review_id")?;

    let existing = load_review(&state, &id).await?;
    ensure_owner(&state, &caller, &existing.user.id)?;

    if !db::delete_review(&state.db, &id).await? {
        return Err(ApiError::not_found("Review not found"));
    }

    tracing::info!(review_id = %id, user_id = %caller.id, "Review deleted");
    Ok(Envelope::ok(existing).with_message("Review deleted"))
}
