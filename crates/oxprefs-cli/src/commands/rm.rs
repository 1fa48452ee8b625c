use anyhow::{Result, bail};
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

use super::KeyNotFound;

#[derive(ClapArgs)]
pub struct Args {
    /// Key to remove
    pub key: String,

    /// Succeed even if the key does not exist
    #[arg(short, long)]
    pub force: bool,
}

#[instrument(level = "info", name = "cmd::rm", skip_all)]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    if !prefs.contains(&args.key) {
        if args.force {
            return Ok(());
        }
        return Err(KeyNotFound(args.key.clone()).into());
    }

    if !prefs.edit().remove(&args.key).commit() {
        bail!("Failed to persist removal of '{}'", args.key);
    }
    Ok(())
}
