//! Settings and filesystem locations
//!
//! Resolves where switchyard keeps its own data and where each managed tool
//! keeps its live configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::AppId;
use crate::error::{ProviderError, ProviderResult};

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "SWITCHYARD_HOME";
/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "switchyard.db";
/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// User settings stored in `settings.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_config_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_config_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_config_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opencode_config_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openclaw_config_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> ProviderResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ProviderError::Parse(format!("{}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ProviderError::io(path, &e)),
        }
    }

    /// Write settings as pretty JSON
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: &Path) -> ProviderResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProviderError::io(parent, &e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ProviderError::io(path, &e))
    }

    /// Configured directory override for an app
    #[must_use]
    pub fn config_dir_override(&self, app: AppId) -> Option<&PathBuf> {
        match app {
            AppId::Claude => self.claude_config_dir.as_ref(),
            AppId::Codex => self.codex_config_dir.as_ref(),
            AppId::Gemini => self.gemini_config_dir.as_ref(),
            AppId::OpenCode => self.opencode_config_dir.as_ref(),
            AppId::OpenClaw => self.openclaw_config_dir.as_ref(),
        }
    }

    /// Point an app at a different config directory, or back at the default
    pub fn set_config_dir(&mut self, app: AppId, dir: Option<PathBuf>) {
        let slot = match app {
            AppId::Claude => &mut self.claude_config_dir,
            AppId::Codex => &mut self.codex_config_dir,
            AppId::Gemini => &mut self.gemini_config_dir,
            AppId::OpenCode => &mut self.opencode_config_dir,
            AppId::OpenClaw => &mut self.openclaw_config_dir,
        };
        *slot = dir;
    }
}

/// Get the switchyard data directory
///
/// Priority:
/// 1. `$SWITCHYARD_HOME`
/// 2. `$HOME/.switchyard` (`%USERPROFILE%` on Windows)
///
/// # Errors
/// Returns an error if no home directory can be determined
pub fn data_dir() -> ProviderResult<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".switchyard"))
        .map_err(|_| ProviderError::Internal("HOME or USERPROFILE environment variable not set".into()))
}

/// Locations of each app's live configuration files
#[derive(Debug, Clone)]
pub struct AppPaths {
    home: PathBuf,
    settings: Settings,
}

impl AppPaths {
    /// Resolve paths relative to an explicit home directory
    #[must_use]
    pub fn new(home: PathBuf, settings: Settings) -> Self {
        Self { home, settings }
    }

    /// Resolve paths relative to the user's home directory
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be found
    pub fn from_home(settings: Settings) -> ProviderResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProviderError::Internal("Cannot find home directory".into()))?;
        Ok(Self::new(home, settings))
    }

    /// Configuration directory of an app
    #[must_use]
    pub fn config_dir(&self, app: AppId) -> PathBuf {
        if let Some(dir) = self.settings.config_dir_override(app) {
            return dir.clone();
        }
        match app {
            AppId::Claude => self.home.join(".claude"),
            AppId::Codex => self.home.join(".codex"),
            AppId::Gemini => self.home.join(".gemini"),
            AppId::OpenCode => self.home.join(".config").join("opencode"),
            AppId::OpenClaw => self.home.join(".openclaw"),
        }
    }

    /// Claude `settings.json`
    #[must_use]
    pub fn claude_settings(&self) -> PathBuf {
        self.config_dir(AppId::Claude).join("settings.json")
    }

    /// Codex `auth.json`
    #[must_use]
    pub fn codex_auth(&self) -> PathBuf {
        self.config_dir(AppId::Codex).join("auth.json")
    }

    /// Codex `config.toml`
    #[must_use]
    pub fn codex_config(&self) -> PathBuf {
        self.config_dir(AppId::Codex).join("config.toml")
    }

    /// Gemini `.env`
    #[must_use]
    pub fn gemini_env(&self) -> PathBuf {
        self.config_dir(AppId::Gemini).join(".env")
    }

    /// Gemini `settings.json`
    #[must_use]
    pub fn gemini_settings(&self) -> PathBuf {
        self.config_dir(AppId::Gemini).join("settings.json")
    }

    /// Shared live file of an additive app
    #[must_use]
    pub fn additive_config(&self, app: AppId) -> Option<PathBuf> {
        match app {
            AppId::OpenCode => Some(self.config_dir(app).join("opencode.json")),
            AppId::OpenClaw => Some(self.config_dir(app).join("openclaw.json")),
            _ => None,
        }
    }

    /// Every live file an app may touch
    #[must_use]
    pub fn live_files(&self, app: AppId) -> Vec<PathBuf> {
        match app {
            AppId::Claude => vec![self.claude_settings()],
            AppId::Codex => vec![self.codex_auth(), self.codex_config()],
            AppId::Gemini => vec![self.gemini_env(), self.gemini_settings()],
            AppId::OpenCode | AppId::OpenClaw => self.additive_config(app).into_iter().collect(),
        }
    }
}
