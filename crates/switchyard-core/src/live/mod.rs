//! Live config reconciliation
//!
//! Pushes the current provider of an app into the tool's own configuration
//! files, and erases providers from additive live configs.

pub mod backup;
mod files;
pub mod render;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::AppId;
use crate::error::ProviderResult;
use crate::provider::Provider;

pub use backup::{write_atomic, BackupFile, LiveBackup};
pub use files::FileReconciler;

/// Materializes providers into an app's live configuration
#[async_trait]
pub trait LiveConfigReconciler: Send + Sync {
    /// Make `provider` the live configuration of `app`.
    ///
    /// Must either fully apply or leave the live config as it was.
    async fn apply(&self, app: AppId, provider: &Provider) -> ProviderResult<()>;

    /// Erase a provider from an additive app's live config
    async fn remove(&self, app: AppId, provider_id: &str) -> ProviderResult<()>;

    /// Read back the live configuration of `app`
    async fn read_live(&self, app: AppId) -> ProviderResult<Value>;
}
