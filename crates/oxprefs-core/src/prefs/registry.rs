//! Named singleton preference stores.

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use super::{PreferenceStore, PrefsError};

/// Process-wide registry used when no registry is configured.
static GLOBAL_REGISTRY: OnceLock<Arc<StoreRegistry>> = OnceLock::new();

/// Stores installed by builds with `singleton(true)`, keyed by store name.
///
/// A later install for the same name replaces the earlier store. Slots are
/// never cleared.
#[derive(Default)]
pub struct StoreRegistry {
    slots: DashMap<String, PreferenceStore>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<StoreRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(StoreRegistry::new()))
            .clone()
    }

    /// Install `store` under its name, returning the store it replaced.
    pub fn install(&self, store: PreferenceStore) -> Option<PreferenceStore> {
        let name = store.name().to_owned();
        let previous = self.slots.insert(name.clone(), store);
        debug!(store = %name, replaced = previous.is_some(), "Installed singleton");
        previous
    }

    /// The singleton installed for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::SingletonNotConfigured`] if nothing was installed.
    pub fn get(&self, name: &str) -> Result<PreferenceStore, PrefsError> {
        self.slots
            .get(name)
            .map(|slot| slot.value().clone())
            .ok_or_else(|| PrefsError::SingletonNotConfigured {
                name: name.to_owned(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("StoreRegistry").field("stores", &names).finish()
    }
}

impl PreferenceStore {
    /// The singleton installed for `name` in the global registry.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::SingletonNotConfigured`] if no build with
    /// `singleton(true)` has run for `name`.
    pub fn singleton(name: &str) -> Result<PreferenceStore, PrefsError> {
        StoreRegistry::global().get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SivCipher;
    use crate::crypto::keys::{PreferenceKey, SIV_KEY_LEN};
    use crate::store::MemoryStore;

    fn prefs(name: &str, fill: u8) -> PreferenceStore {
        let cipher = SivCipher::with_key(PreferenceKey::from_bytes([fill; SIV_KEY_LEN]));
        PreferenceStore::from_parts(Arc::new(MemoryStore::new(name)), Arc::new(cipher), name)
    }

    #[test]
    fn test_unconfigured_name_fails() {
        let registry = StoreRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, PrefsError::SingletonNotConfigured { ref name } if name == "nope"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_install_replaces_previous() {
        let registry = StoreRegistry::new();
        assert!(registry.install(prefs("app", 1)).is_none());

        let second = prefs("app", 2);
        second.edit().put_int("marker", 2).commit();
        assert!(registry.install(second).is_some());

        assert_eq!(registry.get("app").unwrap().get_int("marker", 0), 2);
        assert!(registry.contains("app"));
        assert!(!registry.contains("other"));
    }

    #[test]
    fn test_global_accessor_unconfigured() {
        assert!(matches!(
            PreferenceStore::singleton("registry-test-never-installed"),
            Err(PrefsError::SingletonNotConfigured { .. })
        ));
    }
}
