//! Catalog ingestion: pull game records from the metadata provider in
//! batches, attach each game's best rating and upsert them into the catalog.

pub mod igdb;
pub mod provider;

pub use igdb::IgdbClient;
pub use provider::{GameProvider, ProviderError, ProviderGame};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::IgdbConfig;
use crate::db::{self, DbPool};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to save batch: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("an ingestion run is already in progress")]
    AlreadyRunning,

    #[error("gave up at offset {offset} after {attempts} attempts ({persisted} games saved): {source}")]
    RetriesExhausted {
        offset: u64,
        attempts: u32,
        persisted: usize,
        #[source]
        source: BatchError,
    },
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub batch_size: u32,
    pub total_games: u32,
    pub delay: Duration,
    pub max_retries: u32,
}

impl From<&IgdbConfig> for IngestSettings {
    fn from(config: &IgdbConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            total_games: config.total_games,
            delay: Duration::from_millis(config.delay_ms),
            max_retries: config.max_retries.max(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Games written (inserted or updated)
    pub persisted: usize,
    /// Batches that succeeded
    pub batches: usize,
    /// Failed attempts that were retried
    pub failures: usize,
    /// The provider ran out of records before `total_games` was reached
    pub exhausted: bool,
}

/// Process-wide marker that an ingestion run is active
#[derive(Debug, Default)]
pub struct RunFlag(AtomicBool);

impl RunFlag {
    /// Claim the flag, or `None` if a run already holds it. The flag is
    /// released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<RunGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(Arc::clone(self)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct RunGuard(Arc<RunFlag>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::Release);
    }
}

/// Wait before retry `failures`: `delay * 2^failures`, capped
fn backoff(delay: Duration, failures: u32) -> Duration {
    let factor = 1u32 << failures.min(16);
    delay.saturating_mul(factor).min(MAX_BACKOFF)
}

pub struct Ingestor {
    db: DbPool,
    provider: Arc<dyn GameProvider>,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(db: DbPool, provider: Arc<dyn GameProvider>, settings: IngestSettings) -> Self {
        Self {
            db,
            provider,
            settings,
        }
    }

    /// Fetch, enrich and persist one batch. Returns the number of games saved.
    async fn ingest_batch(&self, offset: u64, limit: u32) -> Result<usize, BatchError> {
        let records = self.provider.fetch_games(offset, limit).await?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut games = Vec::with_capacity(records.len());
        for record in records {
            let rating = self.provider.best_rating(record.id).await?.unwrap_or(0.0);
            games.push(record.into_new_game(rating));
        }

        Ok(db::upsert_games(&self.db, &games).await?)
    }

    /// Run until `total_games` have been saved or the provider runs dry.
    ///
    /// A failing batch is retried at the same offset with exponential
    /// backoff; after `max_retries` consecutive failures the run aborts.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let total_games = self.settings.total_games as usize;
        let mut report = IngestReport::default();
        let mut offset: u64 = 0;
        let mut consecutive_failures: u32 = 0;

        info!(
            batch_size = self.settings.batch_size,
            total_games = self.settings.total_games,
            "Starting catalog ingestion"
        );

        while report.persisted < total_games {
            let remaining = (total_games - report.persisted).min(u32::MAX as usize) as u32;
            let limit = self.settings.batch_size.min(remaining);

            match self.ingest_batch(offset, limit).await {
                Ok(0) => {
                    info!(offset, "Provider returned an empty batch, stopping");
                    report.exhausted = true;
                    break;
                }
                Ok(saved) => {
                    consecutive_failures = 0;
                    report.persisted += saved;
                    report.batches += 1;
                    offset += u64::from(limit);
                    info!(offset, saved, total = report.persisted, "Saved batch");

                    if report.persisted < total_games && !self.settings.delay.is_zero() {
                        tokio::time::sleep(self.settings.delay).await;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    report.failures += 1;

                    if consecutive_failures >= self.settings.max_retries {
                        error!(offset, attempts = consecutive_failures, error = %e, "Ingestion aborted");
                        return Err(IngestError::RetriesExhausted {
                            offset,
                            attempts: consecutive_failures,
                            persisted: report.persisted,
                            source: e,
                        });
                    }

                    let wait = backoff(self.settings.delay, consecutive_failures);
                    warn!(
                        offset,
                        attempt = consecutive_failures,
                        retry_in_ms = wait.as_millis() as u64,
                        error = %e,
                        "Batch failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        info!(
            persisted = report.persisted,
            batches = report.batches,
            failures = report.failures,
            "Catalog ingestion finished"
        );
        Ok(report)
    }

    /// Start a background run, refusing if `flag` shows one in progress.
    /// The flag is held until the spawned run finishes.
    pub fn start(self, flag: &Arc<RunFlag>) -> Result<tokio::task::JoinHandle<()>, IngestError> {
        let guard = flag.try_acquire().ok_or(IngestError::AlreadyRunning)?;
        Ok(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = self.run().await {
                error!("Background ingestion failed: {}", e);
            }
        }))
    }
}
