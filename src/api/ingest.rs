use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

use super::auth::authorize_admin;
use super::envelope::Envelope;
use super::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestStarted {
    pub batch_size: u32,
    pub total_games: u32,
}

/// Start populating the catalog from IGDB in the background
///
/// GET /fetch-games
pub async fn fetch_games(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Envelope<IngestStarted>), ApiError> {
    authorize_admin(&state, &headers).await?;

    let ingestor = state
        .ingestor()
        .ok_or_else(|| ApiError::service_unavailable("Game ingestion is not configured"))?;

    ingestor
        .start(&state.ingestion)
        .map_err(|_| ApiError::conflict("Game ingestion is already running"))?;

    tracing::info!("Catalog ingestion started");

    let started = IngestStarted {
        batch_size: state.config.igdb.batch_size,
        total_games: state.config.igdb.total_games,
    };
    Ok(Envelope::ok(started)
        .with_message("Game ingestion started")
        .status(StatusCode::ACCEPTED))
}
