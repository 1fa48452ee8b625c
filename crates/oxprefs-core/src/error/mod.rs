//! Error types for the preferences crate
//!
//! Re-exports every error type so callers can match on them from one place.

pub use crate::crypto::CryptoError;
pub use crate::prefs::PrefsError;
pub use crate::store::StoreError;
