//! Scanning the environment for overriding variables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::app::AppId;
use crate::error::{ProviderError, ProviderResult};

/// Source path reported for variables set in the process environment
pub const PROCESS_SOURCE: &str = "Process Environment";

/// Shell startup files scanned under the home directory
const SHELL_FILES: &[&str] = &[".bashrc", ".bash_profile", ".zshrc", ".zprofile", ".profile"];

/// Where a conflicting variable was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Set in the running process environment
    System,
    /// Exported from a shell startup file
    File,
}

/// Deduplication key of a conflict: `(var_name, source_path)`
pub type ConflictKey = (String, String);

/// An environment variable that overrides an app's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConflict {
    pub var_name: String,
    pub var_value: String,
    pub source_type: SourceType,
    pub source_path: String,
    #[serde(rename = "appType")]
    pub app: AppId,
}

impl EnvConflict {
    #[must_use]
    pub fn key(&self) -> ConflictKey {
        (self.var_name.clone(), self.source_path.clone())
    }
}

/// Where the detector reads variables from
pub trait EnvSource: Send + Sync {
    /// Variables of the running process
    fn vars(&self) -> Vec<(String, String)>;

    /// Shell files that may export variables; missing files are skipped
    fn shell_files(&self) -> Vec<PathBuf>;
}

/// The real process environment plus the user's shell startup files
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv {
    home: Option<PathBuf>,
}

impl ProcessEnv {
    /// Read the current process and `$HOME` shell files
    #[must_use]
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
        }
    }

    /// Read shell files from a specific home directory
    #[must_use]
    pub fn with_home(home: PathBuf) -> Self {
        Self { home: Some(home) }
    }
}

impl EnvSource for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }

    fn shell_files(&self) -> Vec<PathBuf> {
        self.home
            .as_ref()
            .map(|home| SHELL_FILES.iter().map(|f| home.join(f)).collect())
            .unwrap_or_default()
    }
}

/// Fixed variables and files
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    pub vars: Vec<(String, String)>,
    pub files: Vec<PathBuf>,
}

impl EnvSource for StaticEnv {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars.clone()
    }

    fn shell_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }
}

/// Read-only scanner over an [`EnvSource`]
#[derive(Debug, Clone)]
pub struct ConflictDetector<E> {
    source: E,
}

impl<E: EnvSource> ConflictDetector<E> {
    pub fn new(source: E) -> Self {
        Self { source }
    }

    /// Conflicts affecting one app
    ///
    /// # Errors
    /// Returns `EnvCheckFailure` if a shell file exists but cannot be read
    pub fn check_one(&self, app: AppId) -> ProviderResult<Vec<EnvConflict>> {
        let prefixes = app.env_prefixes();
        if prefixes.is_empty() {
            return Ok(Vec::new());
        }
        let overrides = |name: &str| prefixes.iter().any(|p| name.starts_with(p));

        let mut vars = self.source.vars();
        vars.sort();
        let mut conflicts: Vec<EnvConflict> = vars
            .into_iter()
            .filter(|(name, _)| overrides(name.as_str()))
            .map(|(var_name, var_value)| EnvConflict {
                var_name,
                var_value,
                source_type: SourceType::System,
                source_path: PROCESS_SOURCE.to_string(),
                app,
            })
            .collect();

        for path in self.source.shell_files() {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ProviderError::EnvCheckFailure(format!(
                        "{}: {e}",
                        path.display()
                    )))
                }
            };

            for (line_no, line) in content.lines().enumerate() {
                let Some((name, value)) = parse_assignment(line) else {
                    continue;
                };
                if overrides(name) {
                    conflicts.push(EnvConflict {
                        var_name: name.to_string(),
                        var_value: value.to_string(),
                        source_type: SourceType::File,
                        source_path: format!("{}:{}", path.display(), line_no + 1),
                        app,
                    });
                }
            }
        }

        Ok(conflicts)
    }

    /// Conflicts for every app
    ///
    /// # Errors
    /// Returns `EnvCheckFailure` if any app's scan fails
    pub fn check_all(&self) -> ProviderResult<BTreeMap<AppId, Vec<EnvConflict>>> {
        AppId::ALL
            .into_iter()
            .map(|app| Ok((app, self.check_one(app)?)))
            .collect()
    }
}

/// Parse `export NAME=value` or `NAME=value`, ignoring comments
fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((name, value))
}
