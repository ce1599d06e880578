//! Settings CLI commands
//!
//! Handles: switchyard config show/set-dir

use anyhow::bail;
use clap::Subcommand;
use std::fs;
use std::path::PathBuf;

use switchyard_core::settings::{self, AppPaths, Settings, SETTINGS_FILE};
use switchyard_core::AppId;

/// Settings commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the data directory and the live files of each app
    Show,
    /// Point an app at a different config directory
    SetDir {
        /// Application (claude, codex, gemini, opencode, openclaw)
        #[arg(short, long)]
        app: AppId,
        /// Directory holding the app's config files
        dir: Option<PathBuf>,
        /// Go back to the default directory
        #[arg(long, conflicts_with = "dir")]
        clear: bool,
    },
}

/// Execute a settings command
///
/// # Errors
/// Returns an error if settings cannot be read or written
pub fn execute(action: ConfigCommands) -> anyhow::Result<()> {
    let data_dir = settings::data_dir()?;
    let settings_path = data_dir.join(SETTINGS_FILE);
    let mut current = Settings::load(&settings_path)?;

    match action {
        ConfigCommands::Show => {
            println!("Data directory: {}", data_dir.display());
            let paths = AppPaths::from_home(current)?;
            for app in AppId::ALL {
                println!("{app}:");
                for file in paths.live_files(app) {
                    println!("  {}", file.display());
                }
            }
        }
        ConfigCommands::SetDir { app, dir, clear } => {
            if dir.is_none() && !clear {
                bail!("Pass a directory or --clear");
            }
            let dir = dir.map(|d| fs::canonicalize(&d).unwrap_or(d));
            current.set_config_dir(app, dir.clone());
            current.save(&settings_path)?;
            match dir {
                Some(dir) => println!("{app} config directory: {}", dir.display()),
                None => println!("{app} config directory reset to default"),
            }
        }
    }
    Ok(())
}
