#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use oxprefs_core::store::{MemoryBackend, StoreProvider};
use oxprefs_core::{
    KdfParams, PreferenceConfig, PreferenceConfigBuilder, PreferenceListener, PreferenceStore,
    StoreRegistry,
};

pub const TEST_PASSWORD: &str = "test-password-12345";
pub const OTHER_PASSWORD: &str = "another-password-67890";

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder with cheap KDF parameters and an isolated provider and registry.
pub fn builder(provider: Arc<dyn StoreProvider>, name: &str) -> PreferenceConfigBuilder {
    init_tracing();
    PreferenceConfig::builder()
        .password(TEST_PASSWORD)
        .store_name(name)
        .kdf_params(KdfParams::fast())
        .provider(provider)
        .registry(Arc::new(StoreRegistry::new()))
}

/// A store on a fresh in-memory backend, plus the backend for raw inspection.
pub fn memory_prefs(name: &str) -> (PreferenceStore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let prefs = builder(backend.clone(), name)
        .build()
        .expect("Failed to build preference store");
    (prefs, backend)
}

/// Listener recording every key it is called with.
pub fn recording_listener() -> (Arc<Mutex<Vec<String>>>, Arc<dyn PreferenceListener>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn PreferenceListener> = Arc::new(move |_: &PreferenceStore, key: &str| {
        sink.lock().unwrap().push(key.to_string());
    });
    (seen, listener)
}

/// Recorded keys, sorted.
pub fn sorted(seen: &Mutex<Vec<String>>) -> Vec<String> {
    let mut keys = seen.lock().unwrap().clone();
    keys.sort();
    keys
}
