//! Switchyard CLI - Command-line interface for Switchyard
//!
//! Provides `switchyard provider`, `switchyard env`, `switchyard config`,
//! `switchyard sync` and `switchyard live`.

mod commands;

use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use switchyard_core::live::FileReconciler;
use switchyard_core::settings::{self, AppPaths, Settings, DATABASE_FILE, SETTINGS_FILE};
use switchyard_core::storage::Database;
use switchyard_core::{AppId, ProviderError, SwitchCoordinator};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::env::EnvCommands;
use commands::provider::ProviderCommands;

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Switchyard - provider switcher for AI coding CLIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage providers
    Provider {
        #[command(subcommand)]
        action: ProviderCommands,
    },
    /// Check for environment variables overriding providers
    Env {
        #[command(subcommand)]
        action: EnvCommands,
    },
    /// Show or change where each app keeps its config
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Write every app's current provider into its live config
    Sync,
    /// Print an app's live config
    Live {
        /// Application (claude, codex, gemini, opencode, openclaw)
        #[arg(short, long)]
        app: AppId,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Provider { action } => run_provider(action).await,
        Commands::Env { action } => commands::env::execute(&action),
        Commands::Config { action } => commands::config::execute(action),
        Commands::Sync => run_sync().await,
        Commands::Live { app } => run_live(app).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<ProviderError>() {
            Some(err) => eprintln!("Error [{}]: {err}", err.code()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

/// Open the database and live config paths under the data directory
fn open_coordinator() -> anyhow::Result<Arc<SwitchCoordinator>> {
    let data_dir = settings::data_dir()?;
    fs::create_dir_all(&data_dir)?;

    let settings = Settings::load(&data_dir.join(SETTINGS_FILE))?;
    let db = Database::open(&data_dir.join(DATABASE_FILE))?;
    let reconciler = FileReconciler::new(AppPaths::from_home(settings)?);

    Ok(Arc::new(SwitchCoordinator::new(db, Arc::new(reconciler))))
}

async fn run_provider(action: ProviderCommands) -> anyhow::Result<()> {
    let coordinator = open_coordinator()?;
    commands::provider::execute(action, &coordinator).await
}

async fn run_sync() -> anyhow::Result<()> {
    let coordinator = open_coordinator()?;
    let failures = coordinator.sync_current_to_live().await?;
    if failures.is_empty() {
        println!("Live configs are in sync.");
        return Ok(());
    }
    for (app, err) in &failures {
        eprintln!("  {app}: {err}");
    }
    anyhow::bail!("{} app(s) failed to sync", failures.len())
}

async fn run_live(app: AppId) -> anyhow::Result<()> {
    let coordinator = open_coordinator()?;
    let live = coordinator.read_live(app).await?;
    println!("{}", serde_json::to_string_pretty(&live)?);
    Ok(())
}
