#![forbid(unsafe_code)]

use std::fmt;

use generic_array::{GenericArray, typenum::U64};
use secrecy::{ExposeSecret, SecretBox};
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, Zeroizing};

use super::CryptoError;

/// Length of an AES-256-SIV key (MAC key || encryption key).
pub const SIV_KEY_LEN: usize = 64;

/// Domain-separation salt for password-derived preference keys.
///
/// Constant, so one password derives the same key in every process and a store
/// can be reopened later.
const KDF_SALT: &[u8] = b"oxprefs/v1/aes-siv-key";

/// scrypt cost parameters used to turn a password into a [`PreferenceKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost parameter N.
    pub log_n: u8,
    /// Block size parameter.
    pub r: u32,
    /// Parallelization parameter.
    pub p: u32,
}

impl KdfParams {
    /// Default cost: N = 2^15, r = 8, p = 1 (about 32 MiB of memory).
    pub const DEFAULT: Self = Self { log_n: 15, r: 8, p: 1 };

    /// Cheap parameters for tests and throwaway stores.
    ///
    /// These offer very little brute-force resistance and should not protect
    /// anything that outlives the process.
    pub const fn fast() -> Self {
        Self { log_n: 10, r: 8, p: 1 }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The AES-SIV key protecting one preference store.
///
/// Derived once from the store password with scrypt. The key material lives in a
/// [`SecretBox`], which zeroizes it on drop and keeps it out of `Debug` output.
pub struct PreferenceKey {
    key: SecretBox<[u8; SIV_KEY_LEN]>,
}

impl PreferenceKey {
    /// Derive a key from a password.
    ///
    /// The password is normalized to Unicode NFC first, so the same password typed
    /// on different platforms opens the same store.
    pub fn derive(password: &str, params: &KdfParams) -> Result<Self, CryptoError> {
        let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, SIV_KEY_LEN)
            .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;

        let normalized = Zeroizing::new(password.nfc().collect::<String>());
        let mut key = Box::new([0u8; SIV_KEY_LEN]);
        if let Err(e) = scrypt::scrypt(normalized.as_bytes(), KDF_SALT, &scrypt_params, &mut key[..]) {
            key.zeroize();
            return Err(CryptoError::KeyDerivationFailed(e.to_string()));
        }

        Ok(Self {
            key: SecretBox::new(key),
        })
    }

    /// Wrap raw key material.
    ///
    /// The caller is responsible for zeroing the original array if it held
    /// sensitive data.
    pub fn from_bytes(bytes: [u8; SIV_KEY_LEN]) -> Self {
        Self {
            key: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Execute a function with access to the key as a `GenericArray`, the form
    /// `Aes256Siv::new` expects.
    pub fn with_siv_key<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&GenericArray<u8, U64>) -> R,
    {
        f(GenericArray::from_slice(self.key.expose_secret()))
    }
}

impl fmt::Debug for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(key: &PreferenceKey) -> Vec<u8> {
        key.with_siv_key(|k| k.to_vec())
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = PreferenceKey::derive("password", &KdfParams::fast()).unwrap();
        let b = PreferenceKey::derive("password", &KdfParams::fast()).unwrap();
        assert_eq!(raw(&a), raw(&b));
        assert_eq!(raw(&a).len(), SIV_KEY_LEN);
    }

    #[test]
    fn test_different_passwords_derive_different_keys() {
        let a = PreferenceKey::derive("password", &KdfParams::fast()).unwrap();
        let b = PreferenceKey::derive("passw0rd", &KdfParams::fast()).unwrap();
        assert_ne!(raw(&a), raw(&b));
    }

    #[test]
    fn test_password_is_nfc_normalized() {
        // "é" precomposed vs. "e" + combining acute accent
        let composed = PreferenceKey::derive("caf\u{e9}", &KdfParams::fast()).unwrap();
        let decomposed = PreferenceKey::derive("cafe\u{301}", &KdfParams::fast()).unwrap();
        assert_eq!(raw(&composed), raw(&decomposed));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = KdfParams { log_n: 64, r: 8, p: 1 };
        let result = PreferenceKey::derive("password", &params);
        assert!(matches!(result, Err(CryptoError::InvalidKdfParams(_))));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = PreferenceKey::from_bytes([0x42; SIV_KEY_LEN]);
        let debug = format!("{key:?}");
        assert!(!debug.contains("66"), "debug output must not contain key bytes");
        assert!(debug.contains("PreferenceKey"));
    }
}
