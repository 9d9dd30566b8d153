//! Command-line interface.
//!
//! - no subcommand or `serve` - run the HTTP API
//! - `ingest` - populate the catalog from IGDB in the foreground
//! - `config check` - validate the configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::AppState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "gamecritic")]
#[command(author, version, about = "Game review catalog API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GAMECRITIC_CONFIG", default_value = "gamecritic.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API (the default)
    Serve,

    /// Fetch games from IGDB into the catalog and exit
    Ingest {
        /// Stop after this many games instead of igdb.total_games
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

/// Run a non-server command
pub async fn run_command(cli: &Cli, config: Config) -> Result<()> {
    match &cli.command {
        Some(Commands::Ingest { limit }) => cmd_ingest(config, *limit).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        None | Some(Commands::Serve) => Ok(()),
    }
}

async fn cmd_ingest(mut config: Config, limit: Option<u32>) -> Result<()> {
    if let Some(limit) = limit {
        config.igdb.total_games = limit;
    }

    let db = crate::db::init(&config.server.database_url).await?;
    let state = AppState::from_config(config, db)?;
    let ingestor = state
        .ingestor()
        .context("IGDB is not configured: set igdb.client_id and igdb.access_token")?;

    let report = ingestor.run().await?;

    println!("Saved {} games in {} batches", report.persisted, report.batches);
    if report.failures > 0 {
        println!("{} failed attempts were retried", report.failures);
    }
    if report.exhausted {
        println!("IGDB has no more games matching the query");
    }
    Ok(())
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "set",
        _ => "not set",
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("Defaults and environment variables will be used when starting the server.");
        println!("To create a custom configuration, copy gamecritic.example.toml to gamecritic.toml");
        return Ok(());
    }

    let config = Config::load(config_path)?;

    println!("[OK] Configuration file is valid!");
    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:      {}:{}", config.server.host, config.server.port);
    println!("  Database:     {}", config.server.database_url);
    println!();
    println!("Auth:");
    println!("  Ownership:    {}", enabled(config.auth.enforce_ownership));
    println!("  Admin token:  {}", mask(&config.auth.admin_token));
    println!();
    println!("IGDB:");
    println!("  URL:          {}", config.igdb.base_url);
    println!("  Client ID:    {}", mask(&config.igdb.client_id));
    println!("  Access token: {}", mask(&config.igdb.access_token));
    println!(
        "  Batches:      {} games per batch, {} total, {} ms apart",
        config.igdb.batch_size, config.igdb.total_games, config.igdb.delay_ms
    );
    match config.igdb.platform {
        Some(platform) => println!("  Platform:     {}", platform),
        None => println!("  Platform:     any"),
    }
    println!();
    println!("Images:");
    println!("  URL:          {}", config.images.base_url);
    println!("  API key:      {}", mask(&config.images.api_key));
    println!("  Size:         {}", config.images.size);
    println!();

    let mut warnings = Vec::new();
    if config.igdb.client_id.is_none() || config.igdb.access_token.is_none() {
        warnings.push("IGDB credentials missing - /fetch-games and `ingest` are disabled");
    }
    if config.images.api_key.is_none() {
        warnings.push("No image API key - /create is disabled");
    }
    if config.auth.admin_token.is_none() {
        warnings.push("No admin token - any logged-in user can trigger ingestion");
    }

    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("  [!] {}", warning);
        }
    }

    Ok(())
}
