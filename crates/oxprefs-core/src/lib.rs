#![forbid(unsafe_code)]

//! Encrypted preferences on top of a plain string key-value store.
//!
//! Every logical key and value is encrypted with AES-SIV and transport-encoded
//! into a storage-safe token before it reaches the underlying [`store::RawStore`].
//! Callers only ever see plaintext through the typed [`PreferenceStore`] API.
//!
//! # Example
//!
//! ```
//! use oxprefs_core::{KdfParams, PreferenceConfig};
//!
//! let prefs = PreferenceConfig::builder()
//!     .password("correct horse battery staple")
//!     .store_name("doc-example")
//!     .kdf_params(KdfParams::fast())
//!     .build()?;
//!
//! prefs.edit().put_int("age", 30).commit();
//! assert_eq!(prefs.get_int("age", -1), 30);
//! # Ok::<(), oxprefs_core::PrefsError>(())
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod prefs;
pub mod store;

pub use codec::value::{PrefValue, Storable, ValueKind};
pub use crypto::keys::KdfParams;
pub use prefs::{
    DEFAULT_STORE_NAME, Editor, EncryptionUtils, ListenerHandle, PreferenceConfig,
    PreferenceConfigBuilder, PreferenceListener, PreferenceStore, PrefsError, StoreRegistry,
};
