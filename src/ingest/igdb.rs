//! IGDB API client.
//!
//! IGDB takes its query language (Apicalypse) as a plain-text POST body and
//! authenticates with a Twitch client id plus app access token.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::IgdbConfig;

use super::provider::{GameProvider, ProviderError, ProviderGame, RatingRecord};

const GAME_FIELDS: &str = "name, cover.url, first_release_date, platforms.name, genres.name, \
    summary, slug, involved_companies.company.name, rating, screenshots.url";

pub struct IgdbClient {
    base_url: String,
    client_id: String,
    access_token: String,
    platform: Option<u32>,
    client: reqwest::Client,
}

impl IgdbClient {
    /// Build a client from config. Fails when credentials are missing.
    pub fn from_config(config: &IgdbConfig) -> Result<Self, ProviderError> {
        let client_id = config
            .client_id
            .clone()
            .ok_or(ProviderError::NotConfigured("igdb.client_id"))?;
        // IGDB_CLIENT_SECRET may hold a complete `Bearer <token>` header value
        let access_token = config
            .access_token
            .as_deref()
            .map(str::trim_start)
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t).trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::NotConfigured("igdb.access_token"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("gamecritic/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id,
            access_token,
            platform: config.platform.filter(|p| *p != 0),
            client,
        })
    }

    /// POST an Apicalypse query to an endpoint
    async fn query<T: DeserializeOwned>(&self, endpoint: &str, body: String) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(%url, query = %body, "IGDB request");

        let response = self
            .client
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", self.authorization())
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn games_query(&self, offset: u64, limit: u32) -> String {
        let filter = match self.platform {
            Some(platform) => format!(" where platforms = {};", platform),
            None => String::new(),
        };
        format!(
            "fields {};{} limit {}; offset {};",
            GAME_FIELDS, filter, limit, offset
        )
    }
}

fn rating_query(game_id: i64) -> String {
    format!(
        "fields rating; where game = {}; limit 1; sort rating desc;",
        game_id
    )
}

#[async_trait]
impl GameProvider for IgdbClient {
    async fn fetch_games(&self, offset: u64, limit: u32) -> Result<Vec<ProviderGame>, ProviderError> {
        self.query("games", self.games_query(offset, limit)).await
    }

    async fn best_rating(&self, game_id: i64) -> Result<Option<f64>, ProviderError> {
        let ratings: Vec<RatingRecord> = self.query("game_ratings", rating_query(game_id)).await?;
        Ok(ratings.into_iter().next().and_then(|r| r.rating))
    }
}
