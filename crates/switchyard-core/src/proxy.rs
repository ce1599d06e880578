//! Proxy takeover status
//!
//! The proxy runs elsewhere; this side only stores its latest reported
//! status and answers which provider is effectively active.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;

use crate::app::AppId;

/// A provider the proxy is currently routing an app to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTarget {
    #[serde(rename = "appType")]
    pub app: AppId,
    pub provider_id: String,
}

/// Status reported by the proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatus {
    pub is_running: bool,
    #[serde(default)]
    pub active_targets: Vec<ActiveTarget>,
    #[serde(default)]
    pub takeover_status: HashMap<AppId, bool>,
}

impl ProxyStatus {
    /// Whether the proxy has taken over an app's traffic
    #[must_use]
    pub fn takeover_active(&self, app: AppId) -> bool {
        self.is_running && self.takeover_status.get(&app).copied().unwrap_or(false)
    }

    /// Provider the proxy reports for an app
    #[must_use]
    pub fn reported_provider(&self, app: AppId) -> Option<&str> {
        self.active_targets
            .iter()
            .find(|t| t.app == app)
            .map(|t| t.provider_id.as_str())
    }

    /// Effective active provider.
    ///
    /// The proxy's reported provider wins while takeover is active for the
    /// app; otherwise the stored current id is used.
    #[must_use]
    pub fn effective_active(&self, app: AppId, stored: Option<String>) -> Option<String> {
        if self.takeover_active(app) {
            if let Some(reported) = self.reported_provider(app) {
                return Some(reported.to_string());
            }
        }
        stored
    }
}

/// Holds the latest proxy status and fans it out to watchers
#[derive(Debug)]
pub struct ProxyTakeoverObserver {
    tx: watch::Sender<ProxyStatus>,
}

impl ProxyTakeoverObserver {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProxyStatus::default());
        Self { tx }
    }

    /// Record a status pushed by the proxy
    pub fn update(&self, status: ProxyStatus) {
        self.tx.send_replace(status);
    }

    /// Latest status
    #[must_use]
    pub fn snapshot(&self) -> ProxyStatus {
        self.tx.borrow().clone()
    }

    /// Receive every future status change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ProxyStatus> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn takeover_active(&self, app: AppId) -> bool {
        self.tx.borrow().takeover_active(app)
    }

    #[must_use]
    pub fn effective_active(&self, app: AppId, stored: Option<String>) -> Option<String> {
        self.tx.borrow().effective_active(app, stored)
    }
}

impl Default for ProxyTakeoverObserver {
    fn default() -> Self {
        Self::new()
    }
}
