//! Process-local raw store.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use dashmap::DashMap;
use tracing::trace;

use super::{
    PendingChanges, RawChangeListener, RawEditor, RawStore, StoreError, StoreProvider,
    SubscriptionId,
};

/// Entry map plus change subscriptions, shared by the memory and file stores.
pub(crate) struct EntryTable {
    entries: RwLock<BTreeMap<String, String>>,
    listeners: DashMap<SubscriptionId, RawChangeListener>,
    /// Next subscription ID to assign (monotonically increasing).
    next_id: AtomicU64,
}

impl EntryTable {
    pub(crate) fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries: RwLock::new(entries),
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, String> {
        self.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    /// Apply a transaction and return the keys that changed.
    pub(crate) fn apply(&self, changes: PendingChanges) -> Vec<String> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        changes.apply_to(&mut entries)
    }

    pub(crate) fn subscribe(&self, listener: RawChangeListener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Call every listener once per changed key.
    ///
    /// Listeners are collected first so no map shard is locked while they run;
    /// a listener may subscribe, unsubscribe or write to the store.
    pub(crate) fn notify(&self, store: &dyn RawStore, changed: &[String]) {
        if changed.is_empty() {
            return;
        }
        let listeners: Vec<RawChangeListener> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        trace!(
            keys = changed.len(),
            listeners = listeners.len(),
            "dispatching change events"
        );
        for key in changed {
            for listener in &listeners {
                listener(store, key);
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An in-memory [`RawStore`].
///
/// Clones share the same entries and subscriptions. `apply` and `commit` are
/// identical and always succeed.
#[derive(Clone)]
pub struct MemoryStore {
    name: Arc<str>,
    table: Arc<EntryTable>,
}

impl MemoryStore {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::from_entries(name, std::iter::empty::<(String, String)>())
    }

    /// Create a store pre-filled with `entries`.
    pub fn from_entries<I, K, V>(name: impl Into<Arc<str>>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            name: name.into(),
            table: Arc::new(EntryTable::new(entries)),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.name)
            .field("entries", &self.len())
            .finish()
    }
}

impl RawStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.table.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.table.contains(key)
    }

    fn all_entries(&self) -> BTreeMap<String, String> {
        self.table.snapshot()
    }

    fn edit(&self) -> Box<dyn RawEditor> {
        Box::new(MemoryEditor {
            store: self.clone(),
            pending: PendingChanges::default(),
        })
    }

    fn subscribe(&self, listener: RawChangeListener) -> SubscriptionId {
        self.table.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.table.unsubscribe(id)
    }
}

struct MemoryEditor {
    store: MemoryStore,
    pending: PendingChanges,
}

impl RawEditor for MemoryEditor {
    fn put(&mut self, key: &str, value: &str) {
        self.pending.put(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.pending.remove(key);
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    fn apply(&mut self) {
        self.commit();
    }

    fn commit(&mut self) -> bool {
        let changes = std::mem::take(&mut self.pending);
        let changed = self.store.table.apply(changes);
        self.store.table.notify(&self.store, &changed);
        true
    }
}

/// Provider handing out [`MemoryStore`]s by name.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: DashMap<String, MemoryStore>,
}

/// Process-wide memory backend
static GLOBAL_BACKEND: OnceLock<Arc<MemoryBackend>> = OnceLock::new();

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide backend used when no provider is configured.
    pub fn global() -> Arc<MemoryBackend> {
        GLOBAL_BACKEND
            .get_or_init(|| Arc::new(MemoryBackend::new()))
            .clone()
    }

    /// Open (or create) the store called `name`.
    pub fn store(&self, name: &str) -> MemoryStore {
        self.stores
            .entry(name.to_owned())
            .or_insert_with(|| MemoryStore::new(name))
            .clone()
    }
}

impl StoreProvider for MemoryBackend {
    fn open(&self, name: &str) -> Result<Arc<dyn RawStore>, StoreError> {
        Ok(Arc::new(self.store(name)))
    }
}
