//! The underlying raw key-value store contract.
//!
//! The preference layer never persists anything itself. It talks to a
//! [`RawStore`]: a string-to-string map with a transactional editor and change
//! notifications. Two implementations ship with the crate: [`MemoryStore`] for
//! process-local data and tests, and [`FileStore`] which keeps one JSON file per
//! store.

pub mod file;
pub mod memory;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Identifier returned by [`RawStore::subscribe`].
pub type SubscriptionId = u64;

/// Callback invoked with the store and the raw key that changed.
pub type RawChangeListener = Arc<dyn Fn(&dyn RawStore, &str) + Send + Sync>;

/// A persistent string key-value store.
pub trait RawStore: Send + Sync {
    /// The identifier this store was opened under.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;

    fn contains(&self, key: &str) -> bool;

    /// Snapshot of every stored entry.
    fn all_entries(&self) -> BTreeMap<String, String>;

    /// Start a new transaction.
    fn edit(&self) -> Box<dyn RawEditor>;

    /// Register a change listener.
    ///
    /// The listener is called once per key whose stored value changed after a
    /// transaction is applied, on the thread that applied it. Implementations
    /// must not hold internal locks while calling listeners.
    fn subscribe(&self, listener: RawChangeListener) -> SubscriptionId;

    /// Remove a change listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// A pending transaction against a [`RawStore`].
///
/// Changes are invisible to readers until [`apply`](RawEditor::apply) or
/// [`commit`](RawEditor::commit). Both leave the editor empty and reusable.
pub trait RawEditor: Send {
    fn put(&mut self, key: &str, value: &str);

    fn remove(&mut self, key: &str);

    /// Mark every entry for removal. Applied before the staged puts and removes.
    fn clear(&mut self);

    /// Apply in memory now and persist in the background. No failure signal.
    fn apply(&mut self);

    /// Apply and persist synchronously. Returns whether persisting succeeded.
    fn commit(&mut self) -> bool;
}

/// Opens raw stores by name.
///
/// Opening the same name twice returns the same underlying store, so two
/// preference stores configured with one name share data and notifications.
pub trait StoreProvider: Send + Sync {
    fn open(&self, name: &str) -> Result<Arc<dyn RawStore>, StoreError>;
}

/// Errors raised by raw store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of strings.
    #[error("Store file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The store name cannot be used as an identifier.
    #[error("Invalid store name '{0}'")]
    InvalidName(String),
}

/// Staged changes of one transaction.
///
/// Later operations on the same key replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    cleared: bool,
    modified: BTreeMap<String, Option<String>>,
}

impl PendingChanges {
    pub fn put(&mut self, key: &str, value: &str) {
        self.modified.insert(key.to_owned(), Some(value.to_owned()));
    }

    pub fn remove(&mut self, key: &str) {
        self.modified.insert(key.to_owned(), None);
    }

    pub fn clear(&mut self) {
        self.cleared = true;
    }

    pub fn is_empty(&self) -> bool {
        !self.cleared && self.modified.is_empty()
    }

    /// Apply to `entries` and return the keys whose value actually changed.
    pub fn apply_to(self, entries: &mut BTreeMap<String, String>) -> Vec<String> {
        let mut changed = Vec::new();

        if self.cleared {
            let before = std::mem::take(entries);
            for (key, change) in self.modified {
                if let Some(value) = change {
                    entries.insert(key, value);
                }
            }
            changed.extend(
                before
                    .iter()
                    .filter(|(k, v)| entries.get(*k) != Some(*v))
                    .map(|(k, _)| k.clone()),
            );
            changed.extend(
                entries
                    .keys()
                    .filter(|k| !before.contains_key(*k))
                    .cloned(),
            );
            return changed;
        }

        for (key, change) in self.modified {
            match change {
                Some(value) => {
                    if entries.get(&key) != Some(&value) {
                        entries.insert(key.clone(), value);
                        changed.push(key);
                    }
                }
                None => {
                    if entries.remove(&key).is_some() {
                        changed.push(key);
                    }
                }
            }
        }
        changed
    }
}

pub use file::{FileBackend, FileStore};
pub use memory::{MemoryBackend, MemoryStore};

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_put_and_remove_report_changes() {
        let mut map = entries(&[("a", "1"), ("b", "2")]);
        let mut pending = PendingChanges::default();
        pending.put("a", "1"); // unchanged
        pending.put("c", "3");
        pending.remove("b");
        pending.remove("missing");

        let mut changed = pending.apply_to(&mut map);
        changed.sort();
        assert_eq!(changed, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(map, entries(&[("a", "1"), ("c", "3")]));
    }

    #[test]
    fn test_last_operation_on_key_wins() {
        let mut map = BTreeMap::new();
        let mut pending = PendingChanges::default();
        pending.put("k", "1");
        pending.remove("k");
        pending.put("k", "2");
        pending.apply_to(&mut map);
        assert_eq!(map, entries(&[("k", "2")]));
    }

    #[test]
    fn test_clear_runs_before_puts() {
        let mut map = entries(&[("a", "1"), ("b", "2")]);
        let mut pending = PendingChanges::default();
        pending.put("b", "2");
        pending.put("c", "3");
        pending.clear();

        let mut changed = pending.apply_to(&mut map);
        changed.sort();
        assert_eq!(changed, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(map, entries(&[("b", "2"), ("c", "3")]));
    }

    #[test]
    fn test_empty_pending() {
        let mut pending = PendingChanges::default();
        assert!(pending.is_empty());
        pending.clear();
        assert!(!pending.is_empty());
    }
}
