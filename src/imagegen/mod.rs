//! Image generation proxy: forwards a text prompt to an OpenAI-compatible
//! images endpoint and returns the URL of the generated image.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ImagesConfig;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("image provider returned no images")]
    Empty,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return its URL
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

pub struct OpenAiImages {
    base_url: String,
    api_key: String,
    size: String,
    client: reqwest::Client,
}

impl OpenAiImages {
    /// Build from config; `None` when no API key is configured
    pub fn from_config(config: &ImagesConfig) -> Result<Option<Self>, ImageError> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            size: config.size.clone(),
            client,
        }))
    }
}

fn first_url(response: GenerationResponse) -> Result<String, ImageError> {
    response
        .data
        .into_iter()
        .find_map(|image| image.url)
        .ok_or(ImageError::Empty)
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let url = format!("{}/images/generations", self.base_url);
        let body = GenerationRequest {
            prompt,
            n: 1,
            size: &self.size,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Status { status, body });
        }

        first_url(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_key() {
        let config = crate::config::Config::default().images;
        assert!(OpenAiImages::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_configured_with_key_and_timeout() {
        let mut config = crate::config::Config::default().images;
        config.api_key = Some("sk-test".to_string());
        config.timeout_secs = 5;
        config.base_url = "https://images.example/v1/".to_string();

        let images = OpenAiImages::from_config(&config).unwrap().unwrap();
        assert_eq!(images.base_url, "https://images.example/v1");
        assert_eq!(images.size, "512x512");
    }

    #[test]
    fn test_request_body() {
        let body = GenerationRequest {
            prompt: "a pixel-art castle",
            n: 1,
            size: "512x512",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "prompt": "a pixel-art castle", "n": 1, "size": "512x512" })
        );
    }

    #[test]
    fn test_first_url() {
        let response: GenerationResponse = serde_json::from_str(
            r#"{"created": 1, "data": [{"url": "https://img.example/1.png"}]}"#,
        )
        .unwrap();
        assert_eq!(first_url(response).unwrap(), "https://img.example/1.png");

        let empty: GenerationResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(first_url(empty), Err(ImageError::Empty)));
    }
}
