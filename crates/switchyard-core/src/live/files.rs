//! File-backed live config reconciler

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::backup::{write_atomic, LiveBackup};
use super::render::{self, OPENCLAW_PROVIDERS, OPENCODE_PROVIDERS};
use super::LiveConfigReconciler;
use crate::app::AppId;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::Provider;
use crate::settings::AppPaths;

/// Writes providers into the tools' configuration files
#[derive(Debug, Clone)]
pub struct FileReconciler {
    paths: AppPaths,
}

impl FileReconciler {
    /// Create a reconciler over the given app paths
    #[must_use]
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    fn plan_apply(&self, app: AppId, provider: &Provider) -> Result<Vec<(PathBuf, String)>, String> {
        let settings = &provider.settings_config;
        match app {
            AppId::Claude => Ok(vec![(self.paths.claude_settings(), render::render_claude(settings)?)]),
            AppId::Codex => {
                let (auth, config) = render::render_codex(settings)?;
                Ok(vec![
                    (self.paths.codex_auth(), auth),
                    (self.paths.codex_config(), config),
                ])
            }
            AppId::Gemini => {
                let (env, config) = render::render_gemini(settings)?;
                let mut writes = vec![(self.paths.gemini_env(), env)];
                if let Some(config) = config {
                    writes.push((self.paths.gemini_settings(), config));
                }
                Ok(writes)
            }
            AppId::OpenCode | AppId::OpenClaw => {
                let path = self.additive_path(app)?;
                let mut root = read_object(&path)?;
                render::upsert_keyed(&mut root, keyed_path(app), &provider.id, settings.clone())?;
                Ok(vec![(path, to_pretty(&root)?)])
            }
        }
    }

    fn additive_path(&self, app: AppId) -> Result<PathBuf, String> {
        self.paths
            .additive_config(app)
            .ok_or_else(|| format!("{app} does not keep providers side by side"))
    }

    /// Write every planned file, restoring all of them if any write fails
    fn commit(app: AppId, writes: &[(PathBuf, String)]) -> ProviderResult<()> {
        let mut backup = LiveBackup::default();
        for (path, content) in writes {
            let written = backup
                .capture(path)
                .and_then(|()| write_atomic(path, content.as_bytes()));

            if let Err(e) = written {
                if let Err(restore_err) = backup.restore() {
                    warn!(%app, error = %restore_err, "Failed to restore live config after write error");
                }
                return Err(ProviderError::ReconciliationFailure {
                    app,
                    message: format!("{}: {e}", path.display()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LiveConfigReconciler for FileReconciler {
    async fn apply(&self, app: AppId, provider: &Provider) -> ProviderResult<()> {
        let writes = self
            .plan_apply(app, provider)
            .map_err(|message| ProviderError::ReconciliationFailure { app, message })?;
        Self::commit(app, &writes)?;
        info!(%app, provider = %provider.id, files = writes.len(), "Live config updated");
        Ok(())
    }

    async fn remove(&self, app: AppId, provider_id: &str) -> ProviderResult<()> {
        if !app.is_additive() {
            return Err(ProviderError::Validation(format!(
                "{app} does not support removing a provider from its live config"
            )));
        }
        let to_failure = |message| ProviderError::ReconciliationFailure { app, message };

        let path = self.additive_path(app).map_err(to_failure)?;
        let mut root = read_object(&path).map_err(to_failure)?;
        if !render::remove_keyed(&mut root, keyed_path(app), provider_id) {
            return Ok(());
        }
        let content = to_pretty(&root).map_err(to_failure)?;
        Self::commit(app, &[(path, content)])?;
        info!(%app, provider = provider_id, "Removed provider from live config");
        Ok(())
    }

    async fn read_live(&self, app: AppId) -> ProviderResult<Value> {
        match app {
            AppId::Claude => {
                let path = self.paths.claude_settings();
                Ok(read_object_opt(&path).map_err(ProviderError::Parse)?.unwrap_or(Value::Null))
            }
            AppId::Codex => {
                let auth = read_object_opt(&self.paths.codex_auth()).map_err(ProviderError::Parse)?;
                let config = read_text(&self.paths.codex_config()).map_err(ProviderError::Parse)?;
                Ok(json!({ "auth": auth, "config": config }))
            }
            AppId::Gemini => {
                let env = read_text(&self.paths.gemini_env())
                    .map_err(ProviderError::Parse)?
                    .map_or_else(Map::new, |text| render::parse_env(&text));
                let config = read_object_opt(&self.paths.gemini_settings()).map_err(ProviderError::Parse)?;
                Ok(json!({ "env": env, "config": config }))
            }
            AppId::OpenCode | AppId::OpenClaw => {
                let path = self.additive_path(app).map_err(ProviderError::Parse)?;
                read_object(&path).map_err(ProviderError::Parse)
            }
        }
    }
}

fn keyed_path(app: AppId) -> &'static [&'static str] {
    match app {
        AppId::OpenClaw => OPENCLAW_PROVIDERS,
        _ => OPENCODE_PROVIDERS,
    }
}

fn read_text(path: &Path) -> Result<Option<String>, String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("{}: {e}", path.display())),
    }
}

fn read_object_opt(path: &Path) -> Result<Option<Value>, String> {
    read_text(path)?
        .map(|text| render::parse_object(&text).map_err(|e| format!("{}: {e}", path.display())))
        .transpose()
}

fn read_object(path: &Path) -> Result<Value, String> {
    Ok(read_object_opt(path)?.unwrap_or_else(|| Value::Object(Map::new())))
}

fn to_pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| e.to_string())
}
