//! Provider switch coordinator

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppId;
use crate::error::{ProviderError, ProviderResult};
use crate::live::LiveConfigReconciler;
use crate::provider::{Provider, ProviderList, SortUpdate, SwitchEvent};
use crate::proxy::ProxyTakeoverObserver;
use crate::storage::{Database, ProfileStore};

/// Buffered switch events per subscriber
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Owns the provider registry and moves each app's current provider.
///
/// Reads go straight to the store. Mutations take the app's lock and run in
/// a spawned task, so two mutations of one app never interleave and a
/// dropped caller never stops a live config write halfway.
pub struct SwitchCoordinator {
    db: Mutex<Database>,
    app_locks: Mutex<HashMap<AppId, Arc<AsyncMutex<()>>>>,
    reconciler: Arc<dyn LiveConfigReconciler>,
    events: broadcast::Sender<SwitchEvent>,
    proxy: ProxyTakeoverObserver,
}

impl SwitchCoordinator {
    pub fn new(db: Database, reconciler: Arc<dyn LiveConfigReconciler>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db: Mutex::new(db),
            app_locks: Mutex::new(HashMap::new()),
            reconciler,
            events,
            proxy: ProxyTakeoverObserver::new(),
        }
    }

    /// Proxy status consulted for takeover decisions
    pub fn proxy(&self) -> &ProxyTakeoverObserver {
        &self.proxy
    }

    /// Receive a [`SwitchEvent`] whenever an app's current provider changes,
    /// including when it is cleared
    pub fn subscribe(&self) -> broadcast::Receiver<SwitchEvent> {
        self.events.subscribe()
    }

    // Reads

    /// Providers of an app, ordered by sort index
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub fn list(&self, app: AppId) -> ProviderResult<Vec<Provider>> {
        self.with_store(|store| store.list(app))
    }

    /// Providers of an app together with its current pointer
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub fn get_providers(&self, app: AppId) -> ProviderResult<ProviderList> {
        self.with_store(|store| {
            Ok(ProviderList {
                app,
                providers: store.list(app)?,
                current_provider_id: store.current(app)?,
            })
        })
    }

    /// # Errors
    /// Returns `NotFound` if the provider does not exist
    pub fn get(&self, app: AppId, id: &str) -> ProviderResult<Provider> {
        self.with_store(|store| store.get(app, id))
    }

    /// Stored current provider id
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub fn current(&self, app: AppId) -> ProviderResult<Option<String>> {
        self.with_store(|store| store.current(app))
    }

    /// Provider that is actually serving the app: the proxy's target while it
    /// has taken the app over, the stored current id otherwise.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read
    pub fn effective_active(&self, app: AppId) -> ProviderResult<Option<String>> {
        let stored = self.current(app)?;
        Ok(self.proxy.effective_active(app, stored))
    }

    /// Read back an app's live configuration
    ///
    /// # Errors
    /// Returns an error if the live files cannot be read
    pub async fn read_live(&self, app: AppId) -> ProviderResult<Value> {
        self.reconciler.read_live(app).await
    }

    // Mutations

    /// Add a provider.
    ///
    /// An empty id is replaced by a fresh UUID for apps whose ids are not
    /// config keys. The live config is untouched until the provider is
    /// switched to.
    ///
    /// # Errors
    /// Returns an error if the id is invalid or taken
    pub async fn add(self: &Arc<Self>, app: AppId, mut provider: Provider) -> ProviderResult<Provider> {
        if provider.id.is_empty() && !app.uses_config_keys() {
            provider.id = Uuid::new_v4().to_string();
        }
        let this = Arc::clone(self);
        detached(async move {
            let _guard = this.lock_app(app).await;
            let stored = this.with_store(|store| store.create(app, &provider))?;
            info!(%app, provider = %stored.id, "Added provider");
            Ok(stored)
        })
        .await
    }

    /// Replace a provider's settings.
    ///
    /// If it is current, the live config is rewritten too; should that fail
    /// the previous record is put back.
    ///
    /// # Errors
    /// Returns `NotFound` if missing or `ReconciliationFailure` if the live
    /// config could not be rewritten
    pub async fn update(self: &Arc<Self>, app: AppId, provider: Provider) -> ProviderResult<Provider> {
        let this = Arc::clone(self);
        detached(async move { this.update_locked(app, provider).await }).await
    }

    async fn update_locked(&self, app: AppId, provider: Provider) -> ProviderResult<Provider> {
        let _guard = self.lock_app(app).await;
        let (previous, stored, is_current) = self.with_store(|store| {
            let previous = store.get(app, &provider.id)?;
            let stored = store.update(app, &provider)?;
            let is_current = store.current(app)?.as_deref() == Some(stored.id.as_str());
            Ok((previous, stored, is_current))
        })?;

        if is_current && self.writes_live(app) {
            if let Err(e) = self.reconciler.apply(app, &stored).await {
                if let Err(restore_err) = self.with_store(|store| store.update(app, &previous)) {
                    error!(%app, provider = %previous.id, error = %restore_err, "Failed to restore provider after live config error");
                }
                return Err(e);
            }
        }

        info!(%app, provider = %stored.id, live = is_current, "Updated provider");
        Ok(stored)
    }

    /// Duplicate a provider into the slot right after it
    ///
    /// # Errors
    /// Returns `NotFound` for a missing source or `SortUpdateFailure` if the
    /// siblings cannot be re-ranked; no copy exists in either case
    pub async fn duplicate(self: &Arc<Self>, app: AppId, id: &str) -> ProviderResult<Provider> {
        let this = Arc::clone(self);
        let id = id.to_string();
        detached(async move {
            let _guard = this.lock_app(app).await;
            let copy = this.with_store(|store| store.duplicate(app, &id))?;
            info!(%app, source = %id, copy = %copy.id, sort_index = ?copy.sort_index, "Duplicated provider");
            Ok(copy)
        })
        .await
    }

    /// Make `id` the current provider of `app`.
    ///
    /// The pointer moves first and the live config follows; if the live write
    /// fails the pointer is moved back. While the proxy has taken the app
    /// over only the pointer moves.
    ///
    /// # Errors
    /// Returns `InvalidReference` for an unknown id or the reconciler's error
    /// after rolling back
    pub async fn switch_to(self: &Arc<Self>, app: AppId, id: &str) -> ProviderResult<()> {
        let this = Arc::clone(self);
        let id = id.to_string();
        detached(async move { this.switch_locked(app, &id).await }).await
    }

    async fn switch_locked(&self, app: AppId, id: &str) -> ProviderResult<()> {
        let _guard = self.lock_app(app).await;
        let (provider, previous) = self.with_store(|store| {
            let provider = store.find(app, id)?.ok_or_else(|| ProviderError::InvalidReference {
                app,
                id: id.to_string(),
            })?;
            let previous = store.current(app)?;
            store.set_current(app, id)?;
            Ok((provider, previous))
        })?;

        if self.writes_live(app) {
            if let Err(e) = self.reconciler.apply(app, &provider).await {
                if let Err(restore_err) =
                    self.with_store(|store| store.restore_current(app, previous.as_deref()))
                {
                    error!(%app, error = %restore_err, "Failed to roll back current provider");
                }
                warn!(%app, provider = id, error = %e, "Switch rolled back");
                return Err(e);
            }
        } else {
            warn!(%app, provider = id, "Proxy takeover active, live config left to the proxy");
        }

        info!(%app, from = ?previous, to = id, "Switched provider");
        self.publish(app, Some(id));
        Ok(())
    }

    /// Erase a provider from an additive app's live config, keeping it stored.
    ///
    /// Clears the current pointer if it pointed at this provider and
    /// announces the cleared pointer to subscribers.
    ///
    /// # Errors
    /// Returns `Validation` for non-additive apps, `NotFound` for an unknown
    /// id, or the reconciler's error
    pub async fn remove_from_config(self: &Arc<Self>, app: AppId, id: &str) -> ProviderResult<()> {
        if !app.is_additive() {
            return Err(ProviderError::Validation(format!(
                "{app} keeps a single live provider; switch instead of removing"
            )));
        }
        let this = Arc::clone(self);
        let id = id.to_string();
        detached(async move { this.remove_locked(app, &id).await }).await
    }

    async fn remove_locked(&self, app: AppId, id: &str) -> ProviderResult<()> {
        let _guard = self.lock_app(app).await;
        let provider = self.with_store(|store| store.get(app, id))?;
        self.reconciler.remove(app, id).await?;

        let cleared = self.with_store(|store| {
            let is_current = store.current(app)?.as_deref() == Some(id);
            if is_current {
                store.clear_current(app)?;
            }
            Ok(is_current)
        });

        match cleared {
            Ok(cleared) => {
                info!(%app, provider = id, cleared_current = cleared, "Removed provider from live config");
                if cleared {
                    self.publish(app, None);
                }
                Ok(())
            }
            Err(e) => {
                if let Err(restore_err) = self.reconciler.apply(app, &provider).await {
                    error!(%app, provider = id, error = %restore_err, "Failed to restore live entry after remove error");
                }
                Err(e)
            }
        }
    }

    /// Delete a provider permanently.
    ///
    /// A current provider is released first and no other provider takes its
    /// place; subscribers see the pointer cleared. Additive apps also lose it
    /// from their live config.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown id or the reconciler's error
    pub async fn delete_profile(self: &Arc<Self>, app: AppId, id: &str) -> ProviderResult<()> {
        let this = Arc::clone(self);
        let id = id.to_string();
        detached(async move { this.delete_locked(app, &id).await }).await
    }

    async fn delete_locked(&self, app: AppId, id: &str) -> ProviderResult<()> {
        let _guard = self.lock_app(app).await;
        let provider = self.with_store(|store| store.get(app, id))?;

        if app.is_additive() {
            self.reconciler.remove(app, id).await?;
        }

        let deleted = self.with_transaction(|store| {
            let was_current = store.current(app)?.as_deref() == Some(id);
            if was_current {
                store.clear_current(app)?;
            }
            store.delete(app, id)?;
            Ok(was_current)
        });

        match deleted {
            Ok(was_current) => {
                info!(%app, provider = id, was_current, "Deleted provider");
                if was_current {
                    self.publish(app, None);
                }
                Ok(())
            }
            Err(e) => {
                if app.is_additive() {
                    if let Err(restore_err) = self.reconciler.apply(app, &provider).await {
                        error!(%app, provider = id, error = %restore_err, "Failed to restore live entry after delete error");
                    }
                }
                Err(e)
            }
        }
    }

    /// Apply user-chosen sort indices as one batch
    ///
    /// # Errors
    /// Returns `NotFound` if an id is unknown or `SortUpdateFailure` if the
    /// batch could not be written; nothing changes in either case
    pub async fn update_sort_order(self: &Arc<Self>, app: AppId, updates: Vec<SortUpdate>) -> ProviderResult<()> {
        let this = Arc::clone(self);
        detached(async move {
            let _guard = this.lock_app(app).await;
            this.with_store(|store| store.apply_sort_updates(app, &updates))
                .map_err(|e| match e {
                    ProviderError::NotFound { .. } => e,
                    other => ProviderError::SortUpdateFailure {
                        app,
                        message: other.to_string(),
                    },
                })?;
            debug!(%app, count = updates.len(), "Sort order updated");
            Ok(())
        })
        .await
    }

    /// Write every app's current provider into its live config again.
    ///
    /// Returns the apps that failed; the others are still synced.
    ///
    /// # Errors
    /// Returns an error only if the background task itself fails
    pub async fn sync_current_to_live(self: &Arc<Self>) -> ProviderResult<Vec<(AppId, ProviderError)>> {
        let this = Arc::clone(self);
        detached(async move {
            let mut failures = Vec::new();
            for app in AppId::ALL {
                if let Err(e) = this.sync_app(app).await {
                    warn!(%app, error = %e, "Failed to sync live config");
                    failures.push((app, e));
                }
            }
            Ok(failures)
        })
        .await
    }

    async fn sync_app(&self, app: AppId) -> ProviderResult<()> {
        let _guard = self.lock_app(app).await;
        let current = self.with_store(|store| {
            store
                .current(app)?
                .map(|id| store.get(app, &id))
                .transpose()
        })?;

        match current {
            Some(provider) if self.writes_live(app) => self.reconciler.apply(app, &provider).await,
            _ => Ok(()),
        }
    }

    // Helpers

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_store<T>(&self, f: impl FnOnce(&ProfileStore<'_>) -> ProviderResult<T>) -> ProviderResult<T> {
        let db = self.db();
        f(&ProfileStore::new(db.connection()))
    }

    fn with_transaction<T>(
        &self,
        f: impl FnOnce(&ProfileStore<'_>) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let db = self.db();
        let tx = db.connection().unchecked_transaction()?;
        let out = f(&ProfileStore::new(&tx))?;
        tx.commit()?;
        Ok(out)
    }

    async fn lock_app(&self, app: AppId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.app_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(app).or_default())
        };
        lock.lock_owned().await
    }

    fn writes_live(&self, app: AppId) -> bool {
        !self.proxy.takeover_active(app)
    }

    /// `None` announces that the app no longer has a current provider
    fn publish(&self, app: AppId, provider_id: Option<&str>) {
        let event = SwitchEvent {
            app,
            provider_id: provider_id.map(str::to_string),
        };
        if self.events.send(event).is_err() {
            debug!(%app, "No switch event subscribers");
        }
    }
}

/// Run to completion on the runtime even if the caller is dropped
async fn detached<T, F>(work: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| ProviderError::Internal(format!("Provider task failed: {e}")))?
}
