//! Plaintext ⇄ token pipeline.
//!
//! `encrypt_token` = cipher encrypt, then transport encode.
//! `decrypt_token` = transport decode, then cipher decrypt.
//! Keys and values go through exactly the same pipeline.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::transport;
use crate::crypto::{Cipher, CryptoError};

/// Turns logical keys and values into storage tokens and back.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Arc<dyn Cipher>,
}

impl TokenCodec {
    pub fn new(cipher: Arc<dyn Cipher>) -> Self {
        Self { cipher }
    }

    /// Encrypt a plaintext key or value into a token.
    pub fn encrypt_token(&self, plaintext: &str) -> Result<String, CryptoError> {
        let ciphertext = self.cipher.encrypt(plaintext)?;
        Ok(transport::encode(&ciphertext))
    }

    /// Decrypt a token back into plaintext.
    ///
    /// A token outside the token alphabet is rejected before touching the cipher.
    /// Every failure is reported as [`CryptoError::DecryptionFailed`].
    pub fn decrypt_token(&self, token: &str) -> Result<String, CryptoError> {
        if !transport::is_token(token) {
            trace!("rejecting value outside the token alphabet");
            return Err(CryptoError::DecryptionFailed);
        }
        self.cipher
            .decrypt(&transport::decode(token))
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
