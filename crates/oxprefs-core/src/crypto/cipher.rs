//! The symmetric cipher primitive behind every token.
//!
//! [`Cipher`] is the seam between the preference layer and the actual
//! cryptography: plaintext in, base64 text out. [`SivCipher`] is the default
//! implementation, AES-256-SIV under a password-derived [`PreferenceKey`].

use aes_siv::{KeyInit, siv::Aes256Siv};
use base64::{Engine as _, engine::general_purpose};
use tracing::trace;

use super::CryptoError;
use super::keys::{KdfParams, PreferenceKey};

/// A symmetric text cipher bound to one key.
///
/// Implementations must produce ciphertext over the standard base64 alphabet
/// (`A-Z a-z 0-9 + / =`), which is what the transport encoding is built for.
/// Encryption must be deterministic: the preference layer looks keys up by
/// re-encrypting them.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` into standard base64 ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Decrypt standard base64 ciphertext back into plaintext.
    ///
    /// Every failure must map to [`CryptoError::DecryptionFailed`].
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}

/// AES-256-SIV cipher with standard base64 output.
///
/// AES-SIV is a deterministic authenticated cipher: equal plaintexts give equal
/// ciphertexts under one key, and any modification of the ciphertext is detected
/// on decryption.
#[derive(Debug)]
pub struct SivCipher {
    key: PreferenceKey,
}

impl SivCipher {
    /// Derive the key from `password` and build a cipher around it.
    pub fn new(password: &str, params: &KdfParams) -> Result<Self, CryptoError> {
        Ok(Self {
            key: PreferenceKey::derive(password, params)?,
        })
    }

    /// Build a cipher around an existing key.
    pub fn with_key(key: PreferenceKey) -> Self {
        Self { key }
    }
}

impl Cipher for SivCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.key.with_siv_key(|key| {
            let mut cipher = Aes256Siv::new(key);

            // No associated data: keys and values are encrypted identically
            let associated_data: &[&[u8]] = &[];
            let encrypted = cipher
                .encrypt(associated_data, plaintext.as_bytes())
                .map_err(|_| CryptoError::EncryptionFailed)?;

            Ok(general_purpose::STANDARD.encode(encrypted))
        })
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let decoded = general_purpose::STANDARD
            .decode(ciphertext.as_bytes())
            .map_err(|e| {
                trace!("base64 decode failed: {e}");
                CryptoError::DecryptionFailed
            })?;

        self.key.with_siv_key(|key| {
            let mut cipher = Aes256Siv::new(key);

            let associated_data: &[&[u8]] = &[];
            let decrypted = cipher
                .decrypt(associated_data, &decoded)
                .map_err(|_| CryptoError::DecryptionFailed)?;

            String::from_utf8(decrypted).map_err(|e| {
                trace!("decrypted bytes are not UTF-8: {e}");
                CryptoError::DecryptionFailed
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SIV_KEY_LEN;

    fn create_test_cipher() -> SivCipher {
        let mut key = [0u8; SIV_KEY_LEN];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        SivCipher::with_key(PreferenceKey::from_bytes(key))
    }

    fn create_different_cipher() -> SivCipher {
        SivCipher::with_key(PreferenceKey::from_bytes([0xA5; SIV_KEY_LEN]))
    }

    #[test]
    fn test_deterministic_encryption() {
        let cipher = create_test_cipher();
        let a = cipher.encrypt("username").unwrap();
        let b = cipher.encrypt("username").unwrap();
        assert_eq!(a, b, "Encryption should be deterministic");
        assert_eq!(cipher.decrypt(&a).unwrap(), "username");
    }

    #[test]
    fn test_roundtrip() {
        let cipher = create_test_cipher();
        let test_cases = [
            "",
            "a",
            "simple",
            "with spaces and punctuation!?",
            "unicode-café-日本語-🚀",
            "very_long_value_that_spans_multiple_aes_blocks_in_the_ciphertext_output_0123456789",
        ];

        for original in test_cases {
            let encrypted = cipher
                .encrypt(original)
                .unwrap_or_else(|e| panic!("Failed to encrypt '{original}': {e}"));
            let decrypted = cipher
                .decrypt(&encrypted)
                .unwrap_or_else(|e| panic!("Failed to decrypt '{original}': {e}"));
            assert_eq!(original, decrypted, "Roundtrip failed for '{original}'");
        }
    }

    #[test]
    fn test_output_is_standard_base64() {
        let cipher = create_test_cipher();
        for i in 0..64 {
            let encrypted = cipher.encrypt(&format!("value-{i}")).unwrap();
            assert!(
                encrypted
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')),
                "unexpected character in {encrypted}"
            );
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = create_test_cipher().encrypt("secret").unwrap();
        let result = create_different_cipher().decrypt(&encrypted);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = create_test_cipher();
        let encrypted = cipher.encrypt("secret").unwrap();
        let mut bytes = general_purpose::STANDARD.decode(&encrypted).unwrap();
        bytes[0] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(bytes);
        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_invalid_base64_fails() {
        let cipher = create_test_cipher();
        for invalid in ["not base64!", "====", "abc", "-p-s"] {
            assert!(
                matches!(cipher.decrypt(invalid), Err(CryptoError::DecryptionFailed)),
                "'{invalid}' should fail to decrypt"
            );
        }
    }

    #[test]
    fn test_password_derived_cipher() {
        let a = SivCipher::new("pw", &KdfParams::fast()).unwrap();
        let b = SivCipher::new("pw", &KdfParams::fast()).unwrap();
        let encrypted = a.encrypt("shared").unwrap();
        assert_eq!(b.decrypt(&encrypted).unwrap(), "shared");
    }
}
