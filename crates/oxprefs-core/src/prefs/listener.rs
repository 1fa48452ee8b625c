//! Change listeners that see logical keys.
//!
//! The raw store reports changes by token. Each registration installs an
//! adapter on the raw store that decrypts the token and forwards the logical key
//! to the caller's listener. Registrations are tracked in a handle table so they
//! can be removed individually or all at once when the store is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::{PreferenceStore, StoreInner};
use crate::store::{RawChangeListener, RawStore, SubscriptionId};

/// Receives change notifications from a [`PreferenceStore`].
///
/// Called on the thread that applied the change, once per changed key.
pub trait PreferenceListener: Send + Sync {
    fn on_preference_changed(&self, store: &PreferenceStore, key: &str);
}

impl<F> PreferenceListener for F
where
    F: Fn(&PreferenceStore, &str) + Send + Sync,
{
    fn on_preference_changed(&self, store: &PreferenceStore, key: &str) {
        self(store, key);
    }
}

/// Identifies one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

struct ListenerEntry {
    listener: Arc<dyn PreferenceListener>,
    subscription: SubscriptionId,
}

/// Handle table of active registrations for one store.
pub(super) struct ListenerRegistry {
    entries: DashMap<ListenerHandle, ListenerEntry>,
    /// Next handle ID to assign (monotonically increasing).
    next_id: AtomicU64,
    /// Serializes the duplicate check with the insert.
    register_lock: Mutex<()>,
}

impl ListenerRegistry {
    pub(super) fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
            register_lock: Mutex::new(()),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_registered(&self, handle: ListenerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    fn find(&self, listener: &Arc<dyn PreferenceListener>) -> Option<ListenerHandle> {
        self.entries
            .iter()
            .find(|entry| std::ptr::addr_eq(Arc::as_ptr(&entry.listener), Arc::as_ptr(listener)))
            .map(|entry| *entry.key())
    }

    pub(super) fn register(
        &self,
        store: &Arc<StoreInner>,
        listener: Arc<dyn PreferenceListener>,
    ) -> ListenerHandle {
        let _guard = self
            .register_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = self.find(&listener) {
            trace!(%existing, "Listener already registered");
            return existing;
        }

        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let adapter = adapter(Arc::downgrade(store), handle, Arc::clone(&listener));
        let subscription = store.raw.subscribe(adapter);
        self.entries.insert(
            handle,
            ListenerEntry {
                listener,
                subscription,
            },
        );
        debug!(store = %store.name, %handle, "Registered listener");
        handle
    }

    pub(super) fn unregister(&self, raw: &dyn RawStore, handle: ListenerHandle) -> bool {
        match self.entries.remove(&handle) {
            Some((_, entry)) => {
                raw.unsubscribe(entry.subscription);
                debug!(%handle, "Unregistered listener");
                true
            }
            None => false,
        }
    }

    /// Unsubscribe every adapter. Returns how many were removed.
    pub(super) fn drain(&self, raw: &dyn RawStore) -> usize {
        let handles: Vec<ListenerHandle> = self.entries.iter().map(|e| *e.key()).collect();
        handles
            .into_iter()
            .filter(|handle| self.unregister(raw, *handle))
            .count()
    }
}

/// Raw-store callback forwarding decrypted keys to `listener`.
fn adapter(
    store: Weak<StoreInner>,
    handle: ListenerHandle,
    listener: Arc<dyn PreferenceListener>,
) -> RawChangeListener {
    Arc::new(move |_raw: &dyn RawStore, token: &str| {
        let Some(inner) = store.upgrade() else {
            return;
        };
        // Unregistered between dispatch and delivery
        if !inner.listeners.is_registered(handle) {
            return;
        }
        let prefs = PreferenceStore { inner };
        match prefs.inner.codec.decrypt_token(token) {
            Ok(key) => listener.on_preference_changed(&prefs, &key),
            Err(_) => debug!(store = %prefs.inner.name, %handle, "Skipping change to undecryptable key"),
        }
    })
}
