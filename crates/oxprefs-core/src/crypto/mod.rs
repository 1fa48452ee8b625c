//! Cryptographic primitives for encrypted preferences

pub mod cipher;
pub mod keys;

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// # Security Classification
///
/// Decryption failures are collapsed into a single variant. A wrong
/// password, a tampered token and a token that was never produced by this crate
/// all look the same to the caller, so the error cannot be used as an oracle.
#[derive(Error, Debug)]
pub enum CryptoError {
    // =========================================================================
    // USER ERRORS - Typically a wrong password or corrupted input
    // =========================================================================
    /// The token could not be decrypted.
    ///
    /// Covers malformed transport encoding, invalid base64, AES-SIV authentication
    /// failure (wrong key or tampering) and non-UTF-8 plaintext.
    #[error("Decryption failed - wrong password or corrupted/tampered data")]
    DecryptionFailed,

    /// Key derivation failed, typically due to an scrypt computation error.
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // =========================================================================
    // PROGRAMMING ERRORS - Invalid parameters or implementation bugs
    // =========================================================================
    /// Invalid scrypt parameters.
    ///
    /// **[PROGRAMMING ERROR]** The scrypt cost parameters (log2 N, r, p) are out of range.
    #[error("Invalid scrypt parameters: {0}")]
    InvalidKdfParams(String),

    /// AES-SIV encryption failed.
    ///
    /// **[PROGRAMMING ERROR]** AES-SIV encryption should not fail with valid inputs.
    #[error("Unexpected encryption failure")]
    EncryptionFailed,
}

// Re-export commonly used types
pub use cipher::{Cipher, SivCipher};
pub use keys::{KdfParams, PreferenceKey};
