//! Per-user favorite/played/wanted collections.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{self, CollectionKind, GameResponse, User};
use crate::AppState;

use super::envelope::Envelope;
use super::error::ApiError;
use super::validation::require_uuid;

/// A game after a toggle, with whether the caller now has it in the collection
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionToggle {
    #[serde(flatten)]
    pub game: GameResponse,
    pub collection: CollectionKind,
    pub in_collection: bool,
}

fn parse_kind(kind: &str) -> Result<CollectionKind, ApiError> {
    kind.parse()
        .map_err(|e: String| ApiError::validation_field("kind", e))
}

async fn toggle(
    state: &AppState,
    caller: &User,
    game_id: &str,
    kind: CollectionKind,
) -> Result<Envelope<CollectionToggle>, ApiError> {
    require_uuid(game_id, "game_id")?;

    if db::find_game(&state.db, game_id).await?.is_none() {
        return Err(ApiError::not_found("Game not found"));
    }

    let in_collection = db::toggle_collection(&state.db, &caller.id, game_id, kind).await?;

    // Re-read so saved_favorite_by reflects the toggle
    let game = db::find_game(&state.db, game_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    tracing::debug!(user_id = %caller.id, game_id, %kind, in_collection, "Collection toggled");

    Ok(Envelope::ok(CollectionToggle {
        game,
        collection: kind,
        in_collection,
    }))
}

/// Add or remove a game from one of the caller's collections
///
/// PATCH /games/:id/collections/:kind
pub async fn toggle_collection(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path((game_id, kind)): Path<(String, String)>,
) -> Result<Envelope<CollectionToggle>, ApiError> {
    let kind = parse_kind(&kind)?;
    toggle(&state, &caller, &game_id, kind).await
}

/// PATCH /games/:id/addfavorite
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(game_id): Path<String>,
) -> Result<Envelope<CollectionToggle>, ApiError> {
    toggle(&state, &caller, &game_id, CollectionKind::Favorite).await
}

/// The caller's games in one collection
///
/// GET /collections/:kind
pub async fn list_collection(
    State(state): State<Arc<AppState>>,
    caller: User,
    Path(kind): Path<String>,
) -> Result<Envelope<Vec<GameResponse>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let games = db::list_collection_games(&state.db, &caller.id, kind).await?;
    Ok(Envelope::list(games, &format!("There are no {} games", kind)))
}

/// GET /favoritegames
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    caller: User,
) -> Result<Envelope<Vec<GameResponse>>, ApiError> {
    let games = db::list_collection_games(&state.db, &caller.id, CollectionKind::Favorite).await?;
    Ok(Envelope::list(games, "There are no favorite games"))
}
