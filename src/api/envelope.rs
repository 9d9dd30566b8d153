//! Success envelope shared by every handler: `{ "success": true, "response": ..., "message": ... }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(response: T) -> Self {
        Self {
            success: true,
            response: Some(response),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Wrap the envelope with a non-200 status
    pub fn status(self, status: StatusCode) -> (StatusCode, Self) {
        (status, self)
    }
}

impl<T> Envelope<Vec<T>> {
    /// A list envelope that explains an empty result instead of leaving the
    /// client to guess
    pub fn list(items: Vec<T>, empty_message: &str) -> Self {
        let empty = items.is_empty();
        let envelope = Self::ok(items);
        if empty {
            envelope.with_message(empty_message)
        } else {
            envelope
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
