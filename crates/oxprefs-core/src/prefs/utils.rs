//! Direct access to the token pipeline of a store.

use tracing::warn;

use crate::codec::TokenCodec;

/// Encrypts and decrypts single strings with a store's key.
///
/// Useful for precomputing tokens, e.g. shipping a value that the store will
/// later read back with `get_string`. Keys and values share one pipeline, so a
/// token from [`encrypt_string_value`](Self::encrypt_string_value) is valid in
/// either position.
#[derive(Debug, Clone)]
pub struct EncryptionUtils {
    codec: TokenCodec,
}

impl EncryptionUtils {
    pub(super) fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn encrypt_string_value(&self, plaintext: &str) -> Option<String> {
        match self.codec.encrypt_token(plaintext) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Failed to encrypt value");
                None
            }
        }
    }

    /// `None` for anything that is not a token produced under this key.
    pub fn decrypt_string_value(&self, token: &str) -> Option<String> {
        self.codec.decrypt_token(token).ok()
    }
}
