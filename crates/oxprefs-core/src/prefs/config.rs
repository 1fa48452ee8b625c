//! Building a [`PreferenceStore`].
//!
//! The password is required. Everything else has a default:
//!
//! | Option        | Default                      |
//! |---------------|------------------------------|
//! | `store_name`  | [`DEFAULT_STORE_NAME`]       |
//! | `singleton`   | `false`                      |
//! | `kdf_params`  | [`KdfParams::default`]       |
//! | `provider`    | [`MemoryBackend::global`]    |
//! | `registry`    | [`StoreRegistry::global`]    |

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use super::{DEFAULT_STORE_NAME, PreferenceListener, PreferenceStore, PrefsError, StoreRegistry};
use crate::crypto::SivCipher;
use crate::crypto::keys::KdfParams;
use crate::store::{MemoryBackend, StoreProvider};

/// A validated store configuration.
pub struct PreferenceConfig {
    password: SecretString,
    store_name: String,
    singleton: bool,
    listeners: Vec<Arc<dyn PreferenceListener>>,
    kdf_params: KdfParams,
    provider: Arc<dyn StoreProvider>,
    registry: Arc<StoreRegistry>,
}

impl PreferenceConfig {
    pub fn builder() -> PreferenceConfigBuilder {
        PreferenceConfigBuilder::default()
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf_params
    }

    /// Derive the key, open the raw store and register initial listeners.
    ///
    /// With `singleton` set, the new store replaces any previous singleton of
    /// the same name in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Crypto`] if key derivation fails and
    /// [`PrefsError::Store`] if the provider cannot open the store.
    #[instrument(level = "debug", skip_all, fields(store = %self.store_name, singleton = self.singleton))]
    pub fn open(self) -> Result<PreferenceStore, PrefsError> {
        let cipher = SivCipher::new(self.password.expose_secret(), &self.kdf_params)?;
        let raw = self.provider.open(&self.store_name)?;
        let store = PreferenceStore::from_parts(raw, Arc::new(cipher), self.store_name);

        for listener in self.listeners {
            store.register_listener(listener);
        }
        if self.singleton {
            self.registry.install(store.clone());
        }

        info!(listeners = store.listener_count(), "Preference store ready");
        Ok(store)
    }
}

impl fmt::Debug for PreferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceConfig")
            .field("password", &"[REDACTED]")
            .field("store_name", &self.store_name)
            .field("singleton", &self.singleton)
            .field("listeners", &self.listeners.len())
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PreferenceConfig`].
#[derive(Default)]
pub struct PreferenceConfigBuilder {
    password: Option<SecretString>,
    store_name: Option<String>,
    singleton: bool,
    listeners: Vec<Arc<dyn PreferenceListener>>,
    kdf_params: Option<KdfParams>,
    provider: Option<Arc<dyn StoreProvider>>,
    registry: Option<Arc<StoreRegistry>>,
}

impl PreferenceConfigBuilder {
    /// The password every key and value is encrypted under.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    /// Install the built store in the registry under its name.
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// Register `listener` as soon as the store is built. Repeatable.
    pub fn listener(mut self, listener: Arc<dyn PreferenceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = Some(params);
        self
    }

    /// Where raw stores are opened.
    pub fn provider(mut self, provider: Arc<dyn StoreProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Registry receiving the store when `singleton` is set.
    pub fn registry(mut self, registry: Arc<StoreRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::MissingPassword`] if no password, or an empty
    /// one, was set.
    pub fn config(self) -> Result<PreferenceConfig, PrefsError> {
        let password = self
            .password
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or(PrefsError::MissingPassword)?;

        Ok(PreferenceConfig {
            password,
            store_name: self
                .store_name
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_owned()),
            singleton: self.singleton,
            listeners: self.listeners,
            kdf_params: self.kdf_params.unwrap_or_default(),
            provider: self
                .provider
                .unwrap_or_else(|| MemoryBackend::global() as Arc<dyn StoreProvider>),
            registry: self.registry.unwrap_or_else(StoreRegistry::global),
        })
    }

    /// Validate and open the store in one step.
    pub fn build(self) -> Result<PreferenceStore, PrefsError> {
        self.config()?.open()
    }
}

impl fmt::Debug for PreferenceConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceConfigBuilder")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("store_name", &self.store_name)
            .field("singleton", &self.singleton)
            .field("listeners", &self.listeners.len())
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}
