//! Application ids
//!
//! The closed set of CLI tools whose provider configuration is managed here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProviderError, ProviderResult};

/// Longest provider id allowed where ids are config keys
pub const MAX_CONFIG_KEY_LEN: usize = 64;

/// External CLI tool that owns a set of providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppId {
    /// Claude Code (~/.claude/settings.json)
    Claude,
    /// Codex CLI (~/.codex/auth.json + config.toml)
    Codex,
    /// Gemini CLI (~/.gemini/.env + settings.json)
    Gemini,
    /// OpenCode (~/.config/opencode/opencode.json)
    #[serde(rename = "opencode")]
    OpenCode,
    /// OpenClaw (~/.openclaw/openclaw.json)
    #[serde(rename = "openclaw")]
    OpenClaw,
}

impl AppId {
    /// Every application, in display order
    pub const ALL: [AppId; 5] = [
        Self::Claude,
        Self::Codex,
        Self::Gemini,
        Self::OpenCode,
        Self::OpenClaw,
    ];

    /// Lowercase identifier used in storage and on the wire
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::OpenCode => "opencode",
            Self::OpenClaw => "openclaw",
        }
    }

    /// Whether the live config holds several providers side by side.
    ///
    /// Only additive apps support removing a provider from the live config
    /// without deleting it.
    #[must_use]
    pub fn is_additive(&self) -> bool {
        matches!(self, Self::OpenCode | Self::OpenClaw)
    }

    /// Whether provider ids double as keys inside the live config file
    #[must_use]
    pub fn uses_config_keys(&self) -> bool {
        self.is_additive()
    }

    /// Environment variable prefixes that override this app's configuration
    #[must_use]
    pub fn env_prefixes(&self) -> &'static [&'static str] {
        match self {
            Self::Claude => &["ANTHROPIC_"],
            Self::Codex => &["OPENAI_"],
            Self::Gemini => &["GEMINI_", "GOOGLE_GEMINI_"],
            Self::OpenCode | Self::OpenClaw => &[],
        }
    }

    /// Validate a provider id for this app.
    ///
    /// Config-key ids must be `[a-z0-9][a-z0-9_-]*`, at most 64 chars.
    ///
    /// # Errors
    /// Returns a validation error if the id is unusable
    pub fn validate_provider_id(&self, id: &str) -> ProviderResult<()> {
        if id.trim().is_empty() {
            return Err(ProviderError::Validation("Provider id cannot be empty".into()));
        }
        if !self.uses_config_keys() {
            return Ok(());
        }
        if id.len() > MAX_CONFIG_KEY_LEN {
            return Err(ProviderError::Validation(format!(
                "Provider key '{id}' exceeds {MAX_CONFIG_KEY_LEN} characters"
            )));
        }
        let mut chars = id.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if first_ok && rest_ok {
            Ok(())
        } else {
            Err(ProviderError::Validation(format!(
                "Provider key '{id}' must use lowercase letters, digits, '-' or '_' for {self}"
            )))
        }
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            "gemini" => Ok(Self::Gemini),
            "opencode" => Ok(Self::OpenCode),
            "openclaw" => Ok(Self::OpenClaw),
            _ => Err(ProviderError::InvalidApp(s.to_string())),
        }
    }
}

/// Per-app enable flags for prompts and agents.
///
/// Marks which tools an entity should be materialized into. Several entities
/// may be enabled for the same app at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppToggles {
    #[serde(default)]
    pub claude: bool,
    #[serde(default)]
    pub codex: bool,
    #[serde(default)]
    pub gemini: bool,
    #[serde(default)]
    pub opencode: bool,
    #[serde(default)]
    pub openclaw: bool,
}

impl AppToggles {
    #[must_use]
    pub fn is_enabled_for(&self, app: AppId) -> bool {
        match app {
            AppId::Claude => self.claude,
            AppId::Codex => self.codex,
            AppId::Gemini => self.gemini,
            AppId::OpenCode => self.opencode,
            AppId::OpenClaw => self.openclaw,
        }
    }

    pub fn set_enabled_for(&mut self, app: AppId, enabled: bool) {
        let flag = match app {
            AppId::Claude => &mut self.claude,
            AppId::Codex => &mut self.codex,
            AppId::Gemini => &mut self.gemini,
            AppId::OpenCode => &mut self.opencode,
            AppId::OpenClaw => &mut self.openclaw,
        };
        *flag = enabled;
    }

    /// Enabled apps in [`AppId::ALL`] order
    #[must_use]
    pub fn enabled_apps(&self) -> Vec<AppId> {
        AppId::ALL
            .into_iter()
            .filter(|app| self.is_enabled_for(*app))
            .collect()
    }
}
