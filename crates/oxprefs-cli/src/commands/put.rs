use anyhow::{Result, bail};
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

use super::{TypeArg, parse_value};

#[derive(ClapArgs)]
pub struct Args {
    /// Key to write
    pub key: String,

    /// Value to store
    #[arg(allow_hyphen_values = true)]
    pub value: String,

    /// Type of the value
    #[arg(short = 't', long = "type", value_enum, default_value = "string")]
    pub kind: TypeArg,
}

#[instrument(level = "info", name = "cmd::put", skip_all, fields(kind = ?args.kind))]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    let value = parse_value(args.kind.into(), &args.value)?;

    if !prefs.edit().put_value(&args.key, value).commit() {
        bail!("Failed to persist '{}'", args.key);
    }
    Ok(())
}
