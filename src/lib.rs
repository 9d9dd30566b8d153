pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod imagegen;
pub mod ingest;

pub use db::DbPool;

use anyhow::{Context, Result};
use config::Config;
use std::sync::Arc;

use crate::imagegen::{ImageGenerator, OpenAiImages};
use crate::ingest::{GameProvider, IgdbClient, IngestSettings, Ingestor, ProviderError, RunFlag};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    /// Catalog metadata source; `None` until IGDB credentials are configured
    pub provider: Option<Arc<dyn GameProvider>>,
    pub images: Option<Arc<dyn ImageGenerator>>,
    pub ingestion: Arc<RunFlag>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        Self {
            config,
            db,
            provider: None,
            images: None,
            ingestion: Arc::new(RunFlag::default()),
        }
    }

    /// Build state with the outbound clients the config enables
    pub fn from_config(config: Config, db: DbPool) -> Result<Self> {
        let provider = match IgdbClient::from_config(&config.igdb) {
            Ok(client) => Some(client),
            Err(ProviderError::NotConfigured(field)) => {
                tracing::warn!("IGDB ingestion disabled: {} is not set", field);
                None
            }
            Err(e) => return Err(e).context("Failed to build IGDB client"),
        };
        let images =
            OpenAiImages::from_config(&config.images).context("Failed to build image client")?;
        if images.is_none() {
            tracing::warn!("Image generation disabled: images.api_key is not set");
        }

        let mut state = Self::new(config, db);
        if let Some(provider) = provider {
            state = state.with_provider(Arc::new(provider));
        }
        if let Some(images) = images {
            state = state.with_image_generator(Arc::new(images));
        }
        Ok(state)
    }

    pub fn with_provider(mut self, provider: Arc<dyn GameProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    /// An ingestor wired to this state's database and provider
    pub fn ingestor(&self) -> Option<Ingestor> {
        self.provider.as_ref().map(|provider| {
            Ingestor::new(
                self.db.clone(),
                Arc::clone(provider),
                IngestSettings::from(&self.config.igdb),
            )
        })
    }
}
