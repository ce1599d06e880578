//! Provider CLI commands
//!
//! Handles: switchyard provider list/show/add/edit/duplicate/switch/remove-from-config/delete/sort

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use switchyard_core::provider::SortUpdate;
use switchyard_core::{AppId, Provider, SwitchCoordinator};

/// Provider commands
#[derive(Subcommand)]
pub enum ProviderCommands {
    /// List an app's providers in sort order
    List {
        /// Application (claude, codex, gemini, opencode, openclaw)
        #[arg(short, long)]
        app: AppId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one provider
    Show {
        /// Provider id
        id: String,
        #[arg(short, long)]
        app: AppId,
    },
    /// Add a provider
    Add(AddArgs),
    /// Edit a provider's name, notes or settings
    Edit(EditArgs),
    /// Copy a provider into the slot after it
    Duplicate {
        /// Provider id to copy
        id: String,
        #[arg(short, long)]
        app: AppId,
    },
    /// Make a provider current and write it into the live config
    Switch {
        /// Provider id
        id: String,
        #[arg(short, long)]
        app: AppId,
    },
    /// Drop a provider from an additive app's live config but keep it stored
    RemoveFromConfig {
        /// Provider id
        id: String,
        #[arg(short, long)]
        app: AppId,
    },
    /// Delete a provider permanently
    Delete {
        /// Provider id
        id: String,
        #[arg(short, long)]
        app: AppId,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Set sort indices, e.g. `--order a=0 --order b=1`
    Sort {
        #[arg(short, long)]
        app: AppId,
        /// `ID=INDEX` pairs
        #[arg(long = "order", value_name = "ID=INDEX", required = true)]
        order: Vec<String>,
    },
}

/// Arguments for `switchyard provider add`
#[derive(Args)]
pub struct AddArgs {
    /// Display name
    pub name: String,

    #[arg(short, long)]
    pub app: AppId,

    /// Provider id (generated for apps whose ids are not config keys)
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub settings: SettingsInput,

    /// Position in the list
    #[arg(long)]
    pub sort_index: Option<i64>,

    #[arg(long)]
    pub website_url: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Arguments for `switchyard provider edit`
#[derive(Args)]
pub struct EditArgs {
    /// Provider id
    pub id: String,

    #[arg(short, long)]
    pub app: AppId,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub settings: SettingsInput,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Settings payload given inline or from a file
#[derive(Args)]
pub struct SettingsInput {
    /// Settings as a JSON string
    #[arg(long, conflicts_with = "settings_file")]
    pub settings: Option<String>,

    /// Path to a JSON file holding the settings
    #[arg(long)]
    pub settings_file: Option<PathBuf>,
}

impl SettingsInput {
    fn load(&self) -> anyhow::Result<Option<Value>> {
        let text = match (&self.settings, &self.settings_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => return Ok(None),
        };
        let value = serde_json::from_str(&text).context("Settings must be valid JSON")?;
        Ok(Some(value))
    }
}

/// Execute a provider command
///
/// # Errors
/// Returns an error if the command fails
pub async fn execute(action: ProviderCommands, coordinator: &Arc<SwitchCoordinator>) -> anyhow::Result<()> {
    match action {
        ProviderCommands::List { app, json } => {
            let list = coordinator.get_providers(app)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
                return Ok(());
            }
            if list.providers.is_empty() {
                println!("No providers for {app}.");
                return Ok(());
            }

            let active = coordinator.effective_active(app)?;
            println!("Providers for {app}:");
            for p in &list.providers {
                let marker = if active.as_deref() == Some(p.id.as_str()) { "*" } else { " " };
                let index = p.sort_index.map_or_else(|| "-".to_string(), |i| i.to_string());
                println!("{marker} [{index}] {} - {}", p.id, p.name);
            }
        }
        ProviderCommands::Show { id, app } => {
            let provider = coordinator.get(app, &id)?;
            println!("{}", serde_json::to_string_pretty(&provider)?);
        }
        ProviderCommands::Add(args) => {
            let settings = args.settings.load()?.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            let mut provider = Provider::new(args.id.unwrap_or_default(), args.name, settings);
            provider.sort_index = args.sort_index;
            provider.website_url = args.website_url;
            provider.notes = args.notes;

            let added = coordinator.add(args.app, provider).await?;
            println!("Added provider: {}", added.id);
        }
        ProviderCommands::Edit(args) => {
            let mut provider = coordinator.get(args.app, &args.id)?;
            if let Some(name) = args.name {
                provider.name = name;
            }
            if let Some(notes) = args.notes {
                provider.notes = Some(notes);
            }
            if let Some(settings) = args.settings.load()? {
                provider.settings_config = settings;
            }

            coordinator.update(args.app, provider).await?;
            println!("Updated provider: {}", args.id);
        }
        ProviderCommands::Duplicate { id, app } => {
            let copy = coordinator.duplicate(app, &id).await?;
            println!("Created copy: {} ({})", copy.id, copy.name);
        }
        ProviderCommands::Switch { id, app } => {
            coordinator.switch_to(app, &id).await?;
            println!("Switched {app} to {id}");
            if coordinator.proxy().takeover_active(app) {
                println!("Proxy takeover is active; live config left unchanged.");
            }
        }
        ProviderCommands::RemoveFromConfig { id, app } => {
            coordinator.remove_from_config(app, &id).await?;
            println!("Removed {id} from the {app} live config");
        }
        ProviderCommands::Delete { id, app, force } => {
            let provider = coordinator.get(app, &id)?;
            if !force {
                print!("Delete provider '{}' ({})? [y/N] ", provider.name, provider.id);
                io::stdout().flush()?;
                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            coordinator.delete_profile(app, &id).await?;
            println!("Deleted provider: {}", provider.name);
        }
        ProviderCommands::Sort { app, order } => {
            let updates = order
                .iter()
                .map(|pair| parse_sort_pair(pair))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let count = updates.len();
            coordinator.update_sort_order(app, updates).await?;
            println!("Updated {count} sort indices.");
        }
    }

    Ok(())
}

fn parse_sort_pair(pair: &str) -> anyhow::Result<SortUpdate> {
    let Some((id, index)) = pair.split_once('=') else {
        bail!("Expected ID=INDEX, got '{pair}'");
    };
    let sort_index = index
        .trim()
        .parse()
        .with_context(|| format!("Invalid sort index in '{pair}'"))?;
    Ok(SortUpdate {
        id: id.trim().to_string(),
        sort_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_pair() {
        let update = parse_sort_pair("alpha = 3").unwrap();
        assert_eq!(update.id, "alpha");
        assert_eq!(update.sort_index, 3);

        assert!(parse_sort_pair("alpha").is_err());
        assert!(parse_sort_pair("alpha=x").is_err());
    }
}
