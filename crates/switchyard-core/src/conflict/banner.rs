//! Running, deduplicated conflict list

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::detect::{ConflictKey, EnvConflict};

/// Conflicts the user has dismissed this session.
///
/// Owned by the caller and passed in explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dismissal {
    keys: HashSet<ConflictKey>,
}

impl Dismissal {
    #[must_use]
    pub fn covers(&self, conflict: &EnvConflict) -> bool {
        self.keys.contains(&conflict.key())
    }
}

/// Conflicts merged across scans, keyed by `(var_name, source_path)`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictBanner {
    conflicts: Vec<EnvConflict>,
}

impl ConflictBanner {
    /// Add conflicts whose key is not yet listed; returns how many were added
    pub fn merge(&mut self, found: impl IntoIterator<Item = EnvConflict>) -> usize {
        let mut seen: HashSet<ConflictKey> = self.conflicts.iter().map(EnvConflict::key).collect();
        let before = self.conflicts.len();
        for conflict in found {
            if seen.insert(conflict.key()) {
                self.conflicts.push(conflict);
            }
        }
        self.conflicts.len() - before
    }

    /// Replace the whole list with a fresh scan
    pub fn replace(&mut self, found: impl IntoIterator<Item = EnvConflict>) {
        self.conflicts.clear();
        self.merge(found);
    }

    #[must_use]
    pub fn conflicts(&self) -> &[EnvConflict] {
        &self.conflicts
    }

    /// Shown while at least one listed conflict has not been dismissed
    #[must_use]
    pub fn is_visible(&self, dismissal: &Dismissal) -> bool {
        self.conflicts.iter().any(|c| !dismissal.covers(c))
    }

    /// Dismiss everything currently listed
    pub fn dismiss(&self, dismissal: &mut Dismissal) {
        dismissal.keys.extend(self.conflicts.iter().map(EnvConflict::key));
    }
}
