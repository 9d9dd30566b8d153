use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

use super::envelope::Envelope;
use super::error::ApiError;

const MAX_PROMPT_LEN: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct CreateImageRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateImageResponse {
    pub url: String,
}

/// Generate an image from a prompt
///
/// POST /create
pub async fn create_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateImageRequest>, JsonRejection>,
) -> Result<Envelope<CreateImageResponse>, ApiError> {
    let Json(req) = payload?;

    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::validation_field("prompt", "Prompt is required"));
    }
    if prompt.chars().count() > MAX_PROMPT_LEN {
        return Err(ApiError::validation_field(
            "prompt",
            format!("Prompt is too long (max {} characters)", MAX_PROMPT_LEN),
        ));
    }

    let images = state
        .images
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Image generation is not configured"))?;

    let url = images.generate(prompt).await.map_err(|e| {
        tracing::warn!(error = %e, "Image generation failed");
        ApiError::external_service("Image generation failed")
    })?;

    Ok(Envelope::ok(CreateImageResponse { url }))
}
