//! Provider storage operations (CRUD, current pointer, sort order)

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::app::{AppId, MAX_CONFIG_KEY_LEN};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{next_copy_key, now_millis, plan_insert_after, Provider, SortUpdate};

const SELECT_COLUMNS: &str = "SELECT data, sort_index, created_at FROM providers";

/// Provider storage operations
pub struct ProfileStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProfileStore<'a> {
    /// Create a new provider store
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// List an app's providers ordered by sort index.
    ///
    /// Providers without a sort index come last, oldest first.
    ///
    /// # Errors
    /// Returns an error if the providers cannot be read
    pub fn list(&self, app: AppId) -> ProviderResult<Vec<Provider>> {
        list_on(self.conn, app)
    }

    /// Ids of an app's providers
    ///
    /// # Errors
    /// Returns an error if the providers cannot be read
    pub fn provider_ids(&self, app: AppId) -> ProviderResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM providers WHERE app_type = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![app.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Get a provider if it exists
    ///
    /// # Errors
    /// Returns an error if the provider cannot be read
    pub fn find(&self, app: AppId, id: &str) -> ProviderResult<Option<Provider>> {
        find_on(self.conn, app, id)
    }

    /// Get a provider
    ///
    /// # Errors
    /// Returns `NotFound` if the provider does not exist
    pub fn get(&self, app: AppId, id: &str) -> ProviderResult<Provider> {
        self.find(app, id)?.ok_or_else(|| ProviderError::NotFound {
            app,
            id: id.to_string(),
        })
    }

    /// Insert a new provider.
    ///
    /// If its sort index is already taken, that provider and every later one
    /// move down by one in the same transaction.
    ///
    /// # Errors
    /// Returns an error if the id is invalid or already taken, or
    /// `SortUpdateFailure` if the siblings cannot be moved
    pub fn create(&self, app: AppId, provider: &Provider) -> ProviderResult<Provider> {
        app.validate_provider_id(&provider.id)?;
        let tx = self.conn.unchecked_transaction()?;

        if find_on(&tx, app, &provider.id)?.is_some() {
            return Err(ProviderError::Validation(format!(
                "Provider '{}' already exists for {app}",
                provider.id
            )));
        }

        if let Some(slot) = provider.sort_index {
            let siblings = list_on(&tx, app)?;
            if siblings.iter().any(|p| p.sort_index == Some(slot)) {
                let plan = plan_insert_after(&siblings, &provider.id, slot);
                debug!(%app, provider = %provider.id, slot, shifted = plan.len(), "Sort index taken, shifting");
                apply_updates_on(&tx, app, &plan).map_err(|e| ProviderError::SortUpdateFailure {
                    app,
                    message: e.to_string(),
                })?;
            }
        }

        let stored = insert_on(&tx, app, provider)?;
        tx.commit()?;
        Ok(stored)
    }

    /// Replace an existing provider, keeping its creation time and sort index.
    ///
    /// Sort indices only change through [`Self::apply_sort_updates`] and
    /// [`Self::duplicate`].
    ///
    /// # Errors
    /// Returns `NotFound` if the provider does not exist
    pub fn update(&self, app: AppId, provider: &Provider) -> ProviderResult<Provider> {
        let existing = self.get(app, &provider.id)?;

        let mut stored = provider.clone();
        stored.created_at = existing.created_at;
        stored.sort_index = existing.sort_index;
        let data = serde_json::to_string(&stored)?;

        self.conn.execute(
            r"
            UPDATE providers
            SET name = ?3, data = ?4, updated_at = ?5
            WHERE app_type = ?1 AND id = ?2
            ",
            params![app.as_str(), stored.id, stored.name, data, now_millis()],
        )?;

        Ok(stored)
    }

    /// Insert the provider if its id is new, otherwise replace it in place
    ///
    /// # Errors
    /// Returns an error if the provider cannot be written
    pub fn upsert(&self, app: AppId, provider: &Provider) -> ProviderResult<Provider> {
        if self.find(app, &provider.id)?.is_some() {
            self.update(app, provider)
        } else {
            self.create(app, provider)
        }
    }

    /// Delete a provider.
    ///
    /// The current provider cannot be deleted; clear the pointer first.
    ///
    /// # Errors
    /// Returns `NotFound` if missing or `CurrentProvider` if it is current
    pub fn delete(&self, app: AppId, id: &str) -> ProviderResult<()> {
        if self.current(app)?.as_deref() == Some(id) {
            return Err(ProviderError::CurrentProvider {
                app,
                id: id.to_string(),
            });
        }

        let deleted = self.conn.execute(
            "DELETE FROM providers WHERE app_type = ?1 AND id = ?2",
            params![app.as_str(), id],
        )?;

        if deleted == 0 {
            return Err(ProviderError::NotFound {
                app,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Current provider id for an app
    ///
    /// # Errors
    /// Returns an error if the pointer cannot be read
    pub fn current(&self, app: AppId) -> ProviderResult<Option<String>> {
        let current = self
            .conn
            .query_row(
                "SELECT provider_id FROM current_providers WHERE app_type = ?1",
                params![app.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(current)
    }

    /// Point an app at one of its providers
    ///
    /// # Errors
    /// Returns `InvalidReference` if the provider does not exist
    pub fn set_current(&self, app: AppId, id: &str) -> ProviderResult<()> {
        if self.find(app, id)?.is_none() {
            return Err(ProviderError::InvalidReference {
                app,
                id: id.to_string(),
            });
        }

        self.conn.execute(
            r"
            INSERT INTO current_providers (app_type, provider_id, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(app_type) DO UPDATE
            SET provider_id = excluded.provider_id, updated_at = excluded.updated_at
            ",
            params![app.as_str(), id, now_millis()],
        )?;
        Ok(())
    }

    /// Leave an app with no current provider
    ///
    /// # Errors
    /// Returns an error if the pointer cannot be cleared
    pub fn clear_current(&self, app: AppId) -> ProviderResult<()> {
        self.conn.execute(
            "DELETE FROM current_providers WHERE app_type = ?1",
            params![app.as_str()],
        )?;
        Ok(())
    }

    /// Put the pointer back to a previously observed value
    ///
    /// # Errors
    /// Returns an error if the pointer cannot be written
    pub fn restore_current(&self, app: AppId, previous: Option<&str>) -> ProviderResult<()> {
        match previous {
            Some(id) => self.set_current(app, id),
            None => self.clear_current(app),
        }
    }

    /// Apply a batch of sort index changes atomically.
    ///
    /// A batch that leaves any updated provider sharing its index with
    /// another provider is rejected.
    ///
    /// # Errors
    /// Returns `NotFound` if any id is unknown or `SortUpdateFailure` on a
    /// collision; nothing is applied in either case
    pub fn apply_sort_updates(&self, app: AppId, updates: &[SortUpdate]) -> ProviderResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        apply_updates_on(&tx, app, updates)?;

        let mut taken: HashMap<i64, usize> = HashMap::new();
        for index in list_on(&tx, app)?.into_iter().filter_map(|p| p.sort_index) {
            *taken.entry(index).or_default() += 1;
        }
        if let Some(clash) = updates.iter().find(|u| taken.get(&u.sort_index).copied().unwrap_or(0) > 1) {
            return Err(ProviderError::SortUpdateFailure {
                app,
                message: format!(
                    "Sort index {} of '{}' is used by another provider",
                    clash.sort_index, clash.id
                ),
            });
        }

        tx.commit()?;
        Ok(())
    }

    /// Duplicate a provider directly after the original.
    ///
    /// The copy gets `sortIndex = k + 1` and every sibling at `>= k + 1` moves
    /// down by one. The shift and the insert share one transaction: if the
    /// shift fails no copy is created.
    ///
    /// # Errors
    /// Returns `NotFound` for a missing source, `Validation` if no valid copy
    /// key exists, or `SortUpdateFailure` if the re-rank cannot be applied
    pub fn duplicate(&self, app: AppId, id: &str) -> ProviderResult<Provider> {
        let tx = self.conn.unchecked_transaction()?;

        let source = find_on(&tx, app, id)?.ok_or_else(|| ProviderError::NotFound {
            app,
            id: id.to_string(),
        })?;
        let siblings = list_on(&tx, app)?;

        let new_id = if app.uses_config_keys() {
            next_copy_key(
                &source.id,
                siblings.iter().map(|p| p.id.as_str()),
                MAX_CONFIG_KEY_LEN,
            )
        } else {
            Uuid::new_v4().to_string()
        };
        app.validate_provider_id(&new_id)?;

        let slot = source.sort_index.map(|k| k + 1);
        if let Some(slot) = slot {
            let plan = plan_insert_after(&siblings, &source.id, slot);
            debug!(%app, source = %source.id, slot, shifted = plan.len(), "Re-ranking for duplicate");
            apply_updates_on(&tx, app, &plan).map_err(|e| ProviderError::SortUpdateFailure {
                app,
                message: e.to_string(),
            })?;
        }

        let copy = source.duplicate_as(new_id, slot);
        let stored = insert_on(&tx, app, &copy)?;
        tx.commit()?;

        Ok(stored)
    }
}

fn list_on(conn: &Connection, app: AppId) -> ProviderResult<Vec<Provider>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE app_type = ?1 \
         ORDER BY sort_index IS NULL, sort_index, created_at, id"
    ))?;

    let rows = stmt.query_map(params![app.as_str()], |row| {
        let data: String = row.get(0)?;
        let sort_index: Option<i64> = row.get(1)?;
        let created_at: i64 = row.get(2)?;
        Ok((data, sort_index, created_at))
    })?;

    let mut providers = Vec::new();
    for row in rows {
        let (data, sort_index, created_at) = row?;
        providers.push(decode(&data, sort_index, created_at)?);
    }
    Ok(providers)
}

fn find_on(conn: &Connection, app: AppId, id: &str) -> ProviderResult<Option<Provider>> {
    let row = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE app_type = ?1 AND id = ?2"),
            params![app.as_str(), id],
            |row| {
                let data: String = row.get(0)?;
                let sort_index: Option<i64> = row.get(1)?;
                let created_at: i64 = row.get(2)?;
                Ok((data, sort_index, created_at))
            },
        )
        .optional()?;

    row.map(|(data, sort_index, created_at)| decode(&data, sort_index, created_at))
        .transpose()
}

fn insert_on(conn: &Connection, app: AppId, provider: &Provider) -> ProviderResult<Provider> {
    let now = now_millis();
    let mut stored = provider.clone();
    let created_at = *stored.created_at.get_or_insert(now);
    let data = serde_json::to_string(&stored)?;

    conn.execute(
        r"
        INSERT INTO providers (app_type, id, name, data, sort_index, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            app.as_str(),
            stored.id,
            stored.name,
            data,
            stored.sort_index,
            created_at,
            now,
        ],
    )?;

    Ok(stored)
}

fn apply_updates_on(conn: &Connection, app: AppId, updates: &[SortUpdate]) -> ProviderResult<()> {
    let now = now_millis();
    for update in updates {
        let changed = conn.execute(
            r"
            UPDATE providers SET sort_index = ?3, updated_at = ?4
            WHERE app_type = ?1 AND id = ?2
            ",
            params![app.as_str(), update.id, update.sort_index, now],
        )?;
        if changed == 0 {
            return Err(ProviderError::NotFound {
                app,
                id: update.id.clone(),
            });
        }
    }
    Ok(())
}

fn decode(data: &str, sort_index: Option<i64>, created_at: i64) -> ProviderResult<Provider> {
    let mut provider: Provider = serde_json::from_str(data)?;
    provider.sort_index = sort_index;
    provider.created_at = Some(created_at);
    Ok(provider)
}
