//! Catalog browsing endpoints.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::{self, GameFilter, GameResponse, GameSort};
use crate::AppState;

use super::envelope::Envelope;
use super::error::ApiError;
use super::pagination::{PageParams, Pagination};
use super::validation::require_uuid;

const NO_GAMES: &str = "There are no games";

/// Query parameters for GET /games
#[derive(Debug, Default, Deserialize)]
pub struct GameListQuery {
    pub genre: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Query parameters for GET /games/sort
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseOrderQuery {
    pub order: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

/// One page of games plus the count of every match
#[derive(Debug, Serialize, Deserialize)]
pub struct GameList {
    pub games: Vec<GameResponse>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn list_page(
    state: &AppState,
    filter: GameFilter,
    page: PageParams,
) -> Result<Envelope<GameList>, ApiError> {
    let pagination = Pagination::from_params(&page)?;
    let result = db::list_games(&state.db, &filter, pagination.limit(), pagination.offset()).await?;

    let empty = result.games.is_empty();
    let envelope = Envelope::ok(GameList {
        games: result.games,
        total: result.total,
        page: pagination.page_number,
        size: pagination.page_hits,
    });

    Ok(if empty {
        envelope.with_message(NO_GAMES)
    } else {
        envelope
    })
}

/// List games with optional filters, sort and pagination
///
/// GET /games?genre=&platform=&search=&sort=&page=&size=
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GameListQuery>,
) -> Result<Envelope<GameList>, ApiError> {
    let sort = match non_empty(query.sort) {
        Some(sort) => sort
            .parse::<GameSort>()
            .map_err(|e| ApiError::validation_field("sort", e))?,
        None => GameSort::default(),
    };

    let filter = GameFilter {
        genre: non_empty(query.genre),
        platform: non_empty(query.platform),
        search: non_empty(query.search),
        sort,
    };

    list_page(
        &state,
        filter,
        PageParams {
            page: query.page,
            size: query.size,
        },
    )
    .await
}

/// Get a single game
///
/// GET /games/:id
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<GameResponse>, ApiError> {
    require_uuid(&id, "game_id")?;

    let game = db::find_game(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    Ok(Envelope::ok(game))
}

/// Genres of a single game
///
/// GET /games/:id/genres
pub async fn get_game_genres(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<Vec<String>>, ApiError> {
    require_uuid(&id, "game_id")?;

    let game = db::find_game(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    Ok(Envelope::list(game.genres, "This game has no genres"))
}

/// Every distinct genre in the catalog
///
/// GET /genres, GET /games/genres
pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Envelope<Vec<String>>, ApiError> {
    let genres = db::distinct_genres(&state.db).await?;
    Ok(Envelope::list(genres, "There are no genres"))
}

/// Every distinct platform in the catalog
///
/// GET /games/platforms
pub async fn list_platforms(
    State(state): State<Arc<AppState>>,
) -> Result<Envelope<Vec<String>>, ApiError> {
    let platforms = db::distinct_platforms(&state.db).await?;
    Ok(Envelope::list(platforms, "There are no platforms"))
}

/// GET /games/genres/:genre
pub async fn list_games_by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<Envelope<GameList>, ApiError> {
    let filter = GameFilter {
        genre: Some(genre),
        ..Default::default()
    };
    list_page(&state, filter, page).await
}

/// GET /games/platforms/:platform
pub async fn list_games_by_platform(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<Envelope<GameList>, ApiError> {
    let filter = GameFilter {
        platform: Some(platform),
        ..Default::default()
    };
    list_page(&state, filter, page).await
}

/// Games ordered by release date
///
/// GET /games/sort?order=asc|desc
pub async fn list_games_by_release(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReleaseOrderQuery>,
) -> Result<Envelope<GameList>, ApiError> {
    let sort = match non_empty(query.order).as_deref() {
        None | Some("asc") => GameSort::ReleasedAsc,
        Some("desc") => GameSort::ReleasedDesc,
        Some(other) => {
            return Err(ApiError::validation_field(
                "order",
                format!("Unknown order: {} (expected asc or desc)", other),
            ))
        }
    };

    let filter = GameFilter {
        sort,
        ..Default::default()
    };

    list_page(
        &state,
        filter,
        PageParams {
            page: query.page,
            size: query.size,
        },
    )
    .await
}
