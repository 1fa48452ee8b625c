//! The typed, encrypted preference façade.
//!
//! A [`PreferenceStore`] wraps a [`RawStore`] and a [`TokenCodec`]. Every key
//! and value passes through the codec on its way in and out, so the raw store
//! only ever holds tokens:
//!
//! ```text
//! put_int("age", 30)   →  raw["Ab3…-e"] = "Zq9…-p-e"
//! get_int("age", -1)   ←  decrypt(raw[encrypt("age")]) parsed as i32
//! ```
//!
//! Read failures of any kind (absent key, undecryptable token, type mismatch)
//! return the caller's default. Write failures drop the single mutation and log
//! a warning. Only misconfiguration surfaces as [`PrefsError`].

pub mod config;
pub mod editor;
pub mod listener;
pub mod registry;
pub mod utils;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::codec::TokenCodec;
use crate::codec::value::{PrefValue, Storable, ValueKind};
use crate::crypto::{Cipher, CryptoError};
use crate::store::{RawEditor, RawStore, StoreError};

pub use config::{PreferenceConfig, PreferenceConfigBuilder};
pub use editor::Editor;
pub use listener::{ListenerHandle, PreferenceListener};
pub use registry::StoreRegistry;
pub use utils::EncryptionUtils;

use listener::ListenerRegistry;

/// Store name used when the configuration does not set one.
pub const DEFAULT_STORE_NAME: &str = "default";

/// Errors surfaced by configuration and the singleton accessor.
#[derive(Error, Debug)]
pub enum PrefsError {
    /// No password, or an empty one, was configured.
    #[error("An encryption password is required")]
    MissingPassword,

    /// No store was installed as the singleton for this name.
    #[error("No singleton preference store configured for '{name}'")]
    SingletonNotConfigured { name: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Encrypted preferences backed by a raw key-value store.
///
/// Cheap to clone; clones share the codec, the pending transaction and the
/// listener registrations. Registrations end when the last clone is dropped.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    name: String,
    raw: Arc<dyn RawStore>,
    codec: TokenCodec,
    /// The transaction shared by every [`Editor`] of this store.
    pending: Mutex<Box<dyn RawEditor>>,
    listeners: ListenerRegistry,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let removed = self.listeners.drain(self.raw.as_ref());
        if removed > 0 {
            debug!(store = %self.name, removed, "Detached listeners on drop");
        }
    }
}

impl PreferenceStore {
    /// Build a store from an already opened raw store and a cipher.
    ///
    /// Most callers go through [`PreferenceConfig::builder`] instead.
    pub fn from_parts(
        raw: Arc<dyn RawStore>,
        cipher: Arc<dyn Cipher>,
        name: impl Into<String>,
    ) -> Self {
        let pending = Mutex::new(raw.edit());
        Self {
            inner: Arc::new(StoreInner {
                name: name.into(),
                raw,
                codec: TokenCodec::new(cipher),
                pending,
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The underlying raw store.
    pub fn raw(&self) -> &Arc<dyn RawStore> {
        &self.inner.raw
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read `key` as `T`, returning `default` if it is absent, cannot be
    /// decrypted, is empty, or does not parse as `T`.
    pub fn get<T: Storable>(&self, key: &str, default: T) -> T {
        self.plaintext(key)
            .and_then(|text| T::from_storable(&text))
            .unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key, default)
    }

    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get(key, default)
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get(key, default)
    }

    /// Anything other than a stored `"true"` (any ASCII case) reads as `false`.
    pub fn get_boolean(&self, key: &str, default: bool) -> bool {
        self.get(key, default)
    }

    /// Any non-empty stored text is returned as-is, including numbers.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.plaintext(key).unwrap_or_else(|| default.to_owned())
    }

    /// Read `key` as a value of `kind`, or `None` where the typed getters would
    /// return their default.
    pub fn get_value(&self, key: &str, kind: ValueKind) -> Option<PrefValue> {
        self.plaintext(key).and_then(|text| kind.parse(&text))
    }

    /// Whether an entry for `key` exists.
    pub fn contains(&self, key: &str) -> bool {
        self.token(key)
            .is_some_and(|token| self.inner.raw.contains(&token))
    }

    /// Every logical key in the store.
    ///
    /// A stored key that cannot be decrypted (foreign data, or data written
    /// under another password) is included as its raw token.
    pub fn get_all_keys(&self) -> HashSet<String> {
        self.inner
            .raw
            .all_entries()
            .into_keys()
            .map(|token| match self.inner.codec.decrypt_token(&token) {
                Ok(key) => key,
                Err(_) => {
                    debug!(store = %self.inner.name, "Listing undecryptable key as stored");
                    token
                }
            })
            .collect()
    }

    /// Every stored key exactly as it appears in the raw store.
    pub fn get_all_keys_raw(&self) -> HashSet<String> {
        self.inner.raw.all_entries().into_keys().collect()
    }

    /// Decrypted view of every entry. Entries that fail to decrypt are skipped.
    pub fn get_all(&self) -> HashMap<String, String> {
        let codec = &self.inner.codec;
        self.inner
            .raw
            .all_entries()
            .into_iter()
            .filter_map(|(key, value)| {
                let key = codec.decrypt_token(&key).ok()?;
                let value = codec.decrypt_token(&value).ok()?;
                Some((key, value))
            })
            .collect()
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    /// Copy plaintext entries from `external` into this store.
    ///
    /// An entry is written if its key is absent here or `override_existing` is
    /// set; each write is applied on its own. With `remove_after_import`, every
    /// key present here afterwards is removed from `external`, again one apply
    /// per entry. Not atomic. Returns the number of entries written.
    #[instrument(level = "debug", skip_all, fields(store = %self.inner.name, source = %external.name()))]
    pub fn import_from(
        &self,
        external: &dyn RawStore,
        override_existing: bool,
        remove_after_import: bool,
    ) -> usize {
        let mut imported = 0;
        let editor = self.edit();

        for (key, value) in external.all_entries() {
            if self.import_entry(&editor, &key, &value, override_existing) {
                imported += 1;
            }

            if remove_after_import && self.contains(&key) {
                let mut external_editor = external.edit();
                external_editor.remove(&key);
                external_editor.apply();
            }
        }

        debug!(imported, "Import finished");
        imported
    }

    /// Copy typed entries into this store.
    ///
    /// Each value is written as its storable text under the same rule as
    /// [`import_from`](Self::import_from): only if the key is absent here or
    /// `override_existing` is set, one apply per entry. Returns the number of
    /// entries written.
    #[instrument(level = "debug", skip_all, fields(store = %self.inner.name))]
    pub fn import_values<K, I>(&self, entries: I, override_existing: bool) -> usize
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, PrefValue)>,
    {
        let mut imported = 0;
        let editor = self.edit();

        for (key, value) in entries {
            if self.import_entry(&editor, key.as_ref(), &value.to_storable(), override_existing) {
                imported += 1;
            }
        }

        debug!(imported, "Import finished");
        imported
    }

    fn import_entry(&self, editor: &Editor, key: &str, text: &str, override_existing: bool) -> bool {
        if !override_existing && self.contains(key) {
            return false;
        }
        if !editor.stage_put(key, text) {
            return false;
        }
        editor.apply();
        true
    }

    /// Remove every entry of the underlying store, including entries this store
    /// did not write, and commit. Irreversible.
    #[instrument(level = "debug", skip_all, fields(store = %self.inner.name))]
    pub fn force_delete_all(&self) -> bool {
        let entries = self.inner.raw.all_entries();
        let mut editor = self.inner.raw.edit();
        for key in entries.keys() {
            editor.remove(key);
        }
        let committed = editor.commit();
        if committed {
            debug!(removed = entries.len(), "Deleted all entries");
        } else {
            warn!("Failed to persist deletion of all entries");
        }
        committed
    }

    // ========================================================================
    // Listeners, editing, utilities
    // ========================================================================

    /// Register a listener for changes to this store's logical keys.
    ///
    /// Registering the same `Arc` twice returns the existing handle.
    pub fn register_listener(&self, listener: Arc<dyn PreferenceListener>) -> ListenerHandle {
        self.inner.listeners.register(&self.inner, listener)
    }

    /// Stop notifying the listener behind `handle`.
    ///
    /// Returns `false` if the handle was not registered.
    pub fn unregister_listener(&self, handle: ListenerHandle) -> bool {
        self.inner
            .listeners
            .unregister(self.inner.raw.as_ref(), handle)
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// An editor over this store's shared pending transaction.
    pub fn edit(&self) -> Editor {
        Editor::new(self.clone())
    }

    pub fn utils(&self) -> EncryptionUtils {
        EncryptionUtils::new(self.inner.codec.clone())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Token for a logical key or value, `None` if encryption failed.
    fn token(&self, plaintext: &str) -> Option<String> {
        match self.inner.codec.encrypt_token(plaintext) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(store = %self.inner.name, error = %e, "Encryption failed");
                None
            }
        }
    }

    /// Decrypted, non-empty text stored under `key`.
    fn plaintext(&self, key: &str) -> Option<String> {
        let token = self.token(key)?;
        let stored = self.inner.raw.get(&token)?;
        if stored.is_empty() {
            return None;
        }
        match self.inner.codec.decrypt_token(&stored) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(_) => {
                trace!(store = %self.inner.name, "Stored value did not decrypt");
                None
            }
        }
    }

    /// Run `f` against the shared pending transaction.
    fn with_pending<R>(&self, f: impl FnOnce(&mut dyn RawEditor) -> R) -> R {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut **pending)
    }

    /// Detach the pending transaction, leaving a fresh one in its place.
    ///
    /// Apply/commit then run without the lock held, so listeners fired by the
    /// raw store may edit this store again.
    fn take_pending(&self) -> Box<dyn RawEditor> {
        let fresh = self.inner.raw.edit();
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *pending, fresh)
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("name", &self.inner.name)
            .field("listeners", &self.inner.listeners.len())
            .finish_non_exhaustive()
    }
}
