//! Runs conflict scans at startup and after every switch

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::banner::{ConflictBanner, Dismissal};
use super::detect::{ConflictDetector, EnvConflict, EnvSource};
use crate::app::AppId;
use crate::provider::SwitchEvent;

/// Feeds detector results into a shared [`ConflictBanner`].
///
/// Scan failures are advisory: they are logged and never returned.
pub struct ConflictMonitor<E> {
    detector: ConflictDetector<E>,
    banner: Mutex<ConflictBanner>,
}

impl<E: EnvSource + 'static> ConflictMonitor<E> {
    pub fn new(detector: ConflictDetector<E>) -> Self {
        Self {
            detector,
            banner: Mutex::new(ConflictBanner::default()),
        }
    }

    fn banner(&self) -> MutexGuard<'_, ConflictBanner> {
        self.banner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scan every app and merge the results
    pub fn startup_scan(&self) -> usize {
        match self.detector.check_all() {
            Ok(found) => self.banner().merge(found.into_values().flatten()),
            Err(e) => {
                warn!(error = %e, "Environment conflict scan failed");
                0
            }
        }
    }

    /// Scan only the app that was just switched
    pub fn on_switch(&self, app: AppId) -> usize {
        match self.detector.check_one(app) {
            Ok(found) => {
                let added = self.banner().merge(found);
                debug!(%app, added, "Checked environment after switch");
                added
            }
            Err(e) => {
                warn!(%app, error = %e, "Environment conflict scan failed");
                0
            }
        }
    }

    /// Replace the list with a fresh full scan, e.g. after the user removed variables.
    ///
    /// The current list is kept if the scan fails.
    pub fn recheck(&self) {
        match self.detector.check_all() {
            Ok(found) => self.banner().replace(found.into_values().flatten()),
            Err(e) => warn!(error = %e, "Environment conflict re-check failed"),
        }
    }

    #[must_use]
    pub fn conflicts(&self) -> Vec<EnvConflict> {
        self.banner().conflicts().to_vec()
    }

    #[must_use]
    pub fn is_visible(&self, dismissal: &Dismissal) -> bool {
        self.banner().is_visible(dismissal)
    }

    /// Dismiss everything currently listed
    pub fn dismiss(&self, dismissal: &mut Dismissal) {
        self.banner().dismiss(dismissal);
    }

    /// Check each switched app until the event stream closes
    pub fn spawn(self: Arc<Self>, mut events: broadcast::Receiver<SwitchEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        self.on_switch(event.app);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed switch events, rescanning all apps");
                        self.startup_scan();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::detect::StaticEnv;

    fn monitor(vars: &[(&str, &str)]) -> ConflictMonitor<StaticEnv> {
        ConflictMonitor::new(ConflictDetector::new(StaticEnv {
            vars: vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            files: vec![],
        }))
    }

    #[test]
    fn test_startup_scan_twice_has_no_duplicates() {
        let monitor = monitor(&[("ANTHROPIC_API_KEY", "a"), ("OPENAI_API_KEY", "o")]);
        assert_eq!(monitor.startup_scan(), 2);
        assert_eq!(monitor.startup_scan(), 0);
        assert_eq!(monitor.conflicts().len(), 2);
    }

    #[test]
    fn test_on_switch_scans_one_app() {
        let monitor = monitor(&[("ANTHROPIC_API_KEY", "a"), ("OPENAI_API_KEY", "o")]);
        assert_eq!(monitor.on_switch(AppId::Codex), 1);
        assert_eq!(monitor.conflicts()[0].app, AppId::Codex);
    }

    #[test]
    fn test_scan_failure_is_swallowed() {
        let temp = tempfile::TempDir::new().unwrap();
        let monitor = ConflictMonitor::new(ConflictDetector::new(StaticEnv {
            vars: vec![],
            files: vec![temp.path().to_path_buf()],
        }));
        assert_eq!(monitor.startup_scan(), 0);
        monitor.recheck();
        assert!(monitor.conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_monitor_follows_switch_events() {
        let monitor = Arc::new(monitor(&[("GEMINI_API_KEY", "g")]));
        let (tx, rx) = broadcast::channel(8);
        let handle = Arc::clone(&monitor).spawn(rx);

        tx.send(SwitchEvent {
            app: AppId::Gemini,
            provider_id: Some("p".into()),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(monitor.conflicts().len(), 1);
        assert_eq!(monitor.conflicts()[0].var_name, "GEMINI_API_KEY");
    }
}
