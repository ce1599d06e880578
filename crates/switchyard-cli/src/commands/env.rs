//! Environment conflict CLI commands
//!
//! Handles: switchyard env check

use clap::Subcommand;
use std::collections::BTreeMap;

use switchyard_core::conflict::{ConflictDetector, ProcessEnv};
use switchyard_core::AppId;

/// Environment commands
#[derive(Subcommand)]
pub enum EnvCommands {
    /// List variables that override an app's live config
    Check {
        /// Only check one application
        #[arg(short, long)]
        app: Option<AppId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute an environment command
///
/// # Errors
/// Returns an error if the scan fails
pub fn execute(action: &EnvCommands) -> anyhow::Result<()> {
    match action {
        EnvCommands::Check { app, json } => {
            let detector = ConflictDetector::new(ProcessEnv::new());
            let found = match app {
                Some(app) => BTreeMap::from([(*app, detector.check_one(*app)?)]),
                None => detector.check_all()?,
            };

            if *json {
                println!("{}", serde_json::to_string_pretty(&found)?);
                return Ok(());
            }

            let total: usize = found.values().map(Vec::len).sum();
            if total == 0 {
                println!("No conflicting environment variables found.");
                return Ok(());
            }

            println!("Found {total} conflicting environment variable(s):");
            for (app, conflicts) in &found {
                for c in conflicts {
                    println!("  {app}: {} ({})", c.var_name, c.source_path);
                }
            }
        }
    }
    Ok(())
}
