use anyhow::{Result, bail};
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

#[derive(ClapArgs)]
pub struct Args {
    /// Confirm deleting every entry, including ones written with other passwords
    #[arg(long)]
    pub yes: bool,
}

#[instrument(level = "info", name = "cmd::wipe", skip_all)]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    if !args.yes {
        bail!("Refusing to delete every entry of '{}' without --yes", prefs.name());
    }

    let count = prefs.get_all_keys_raw().len();
    if !prefs.force_delete_all() {
        bail!("Failed to persist deletion");
    }
    eprintln!("Deleted {count} entries");
    Ok(())
}
