//! Mutation builder for a [`PreferenceStore`].

use std::fmt;

use tracing::{debug, warn};

use super::PreferenceStore;
use crate::codec::value::{PrefValue, Storable};

/// Stages encrypted mutations into the store's shared pending transaction.
///
/// Every `Editor` returned by [`PreferenceStore::edit`] writes into the same
/// transaction, so a value staged through one editor is committed by another.
/// Nothing is visible to reads until [`apply`](Editor::apply) or
/// [`commit`](Editor::commit); afterwards the transaction starts empty again.
///
/// ```
/// # use oxprefs_core::{KdfParams, PreferenceConfig};
/// # let prefs = PreferenceConfig::builder()
/// #     .password("pw")
/// #     .store_name("editor-doc")
/// #     .kdf_params(KdfParams::fast())
/// #     .build()?;
/// prefs.edit().put_string("user", "ada").put_boolean("admin", false);
/// assert!(!prefs.contains("user"));
///
/// assert!(prefs.edit().commit());
/// assert_eq!(prefs.get_string("user", ""), "ada");
/// # Ok::<(), oxprefs_core::PrefsError>(())
/// ```
pub struct Editor {
    store: PreferenceStore,
}

impl Editor {
    pub(super) fn new(store: PreferenceStore) -> Self {
        Self { store }
    }

    pub fn put_int(&self, key: &str, value: i32) -> &Self {
        self.put(key, &value)
    }

    pub fn put_long(&self, key: &str, value: i64) -> &Self {
        self.put(key, &value)
    }

    pub fn put_float(&self, key: &str, value: f32) -> &Self {
        self.put(key, &value)
    }

    pub fn put_boolean(&self, key: &str, value: bool) -> &Self {
        self.put(key, &value)
    }

    pub fn put_string(&self, key: &str, value: &str) -> &Self {
        self.stage_put(key, value);
        self
    }

    pub fn put_value(&self, key: &str, value: impl Into<PrefValue>) -> &Self {
        self.stage_put(key, &value.into().to_storable());
        self
    }

    /// Stage removal of `key`. A key that is not stored is left alone.
    pub fn remove(&self, key: &str) -> &Self {
        let Some(token) = self.store.token(key) else {
            warn!(store = %self.store.name(), "Dropping remove: key could not be encrypted");
            return self;
        };
        if !self.store.inner.raw.contains(&token) {
            debug!(store = %self.store.name(), "Ignoring remove of absent key");
            return self;
        }
        self.store.with_pending(|pending| pending.remove(&token));
        self
    }

    /// Mark every entry of the underlying store for removal.
    ///
    /// The wipe runs before the puts and removes staged in the same transaction.
    pub fn clear(&self) -> &Self {
        self.store.with_pending(|pending| pending.clear());
        self
    }

    /// Make the staged changes visible now and persist them in the background.
    pub fn apply(&self) {
        self.store.take_pending().apply();
    }

    /// Make the staged changes visible and persist them before returning.
    ///
    /// Returns whether the underlying store persisted successfully.
    pub fn commit(&self) -> bool {
        self.store.take_pending().commit()
    }

    fn put<T: Storable>(&self, key: &str, value: &T) -> &Self {
        self.stage_put(key, &value.to_storable());
        self
    }

    /// Encrypt and stage one pair. Returns `false` if the pair was dropped.
    pub(super) fn stage_put(&self, key: &str, text: &str) -> bool {
        let (Some(key_token), Some(value_token)) = (self.store.token(key), self.store.token(text))
        else {
            warn!(store = %self.store.name(), "Dropping put: encryption failed");
            return false;
        };
        self.store
            .with_pending(|pending| pending.put(&key_token, &value_token));
        true
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("store", &self.store.name())
            .finish()
    }
}
