use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

use super::{KeyNotFound, TypeArg};

#[derive(ClapArgs)]
pub struct Args {
    /// Key to read
    pub key: String,

    /// Type to read the value as
    #[arg(short = 't', long = "type", value_enum, default_value = "string")]
    pub kind: TypeArg,

    /// Printed when the key is absent or not of the requested type
    #[arg(short, long, allow_hyphen_values = true)]
    pub default: Option<String>,
}

#[instrument(level = "info", name = "cmd::get", skip_all, fields(kind = ?args.kind))]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    match prefs.get_value(&args.key, args.kind.into()) {
        Some(value) => println!("{}", value.to_storable()),
        None => match &args.default {
            Some(default) => println!("{default}"),
            None => return Err(KeyNotFound(args.key.clone()).into()),
        },
    }
    Ok(())
}
