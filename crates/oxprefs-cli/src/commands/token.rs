//! Encrypt and decrypt single strings with the store key.
//!
//! Tokens produced here can be written into a store file by other tooling and
//! read back with `get`.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

#[derive(ClapArgs)]
pub struct EncryptArgs {
    /// Text to encrypt
    #[arg(allow_hyphen_values = true)]
    pub text: String,
}

#[derive(ClapArgs)]
pub struct DecryptArgs {
    /// Token to decrypt
    #[arg(allow_hyphen_values = true)]
    pub token: String,
}

#[instrument(level = "info", name = "cmd::encrypt", skip_all)]
pub fn encrypt(prefs: &PreferenceStore, args: &EncryptArgs) -> Result<()> {
    let token = prefs
        .utils()
        .encrypt_string_value(&args.text)
        .context("Encryption failed")?;
    println!("{token}");
    Ok(())
}

#[instrument(level = "info", name = "cmd::decrypt", skip_all)]
pub fn decrypt(prefs: &PreferenceStore, args: &DecryptArgs) -> Result<()> {
    let text = prefs
        .utils()
        .decrypt_string_value(&args.token)
        .context("Token could not be decrypted with this password")?;
    println!("{text}");
    Ok(())
}
