use anyhow::{Result, bail};
use rpassword::read_password;
use std::io::{self, Write};

/// Prompt the user for the store password securely.
/// Input is hidden and not echoed to the terminal.
///
/// For non-interactive use, pass `--password-stdin` or set `OXPREFS_PASSWORD`.
pub fn prompt_password() -> Result<String> {
    eprint!("Store password: ");
    io::stderr().flush()?;

    let password = read_password()?;

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    Ok(password)
}
