//! Keys command - list the entries of a store.
//!
//! # Examples
//!
//! ```bash
//! # Show keys and values as a table
//! oxprefs keys
//!
//! # Machine-readable list of keys
//! oxprefs keys --json
//!
//! # Stored tokens, exactly as they appear on disk
//! oxprefs keys --raw
//! ```

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use oxprefs_core::PreferenceStore;

use crate::output::create_table;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// List stored tokens instead of decrypted keys
    #[arg(long)]
    pub raw: bool,

    /// Output a JSON array of keys
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::keys", skip_all, fields(raw = args.raw, json = args.json))]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    let mut keys: Vec<String> = if args.raw {
        prefs.get_all_keys_raw().into_iter().collect()
    } else {
        prefs.get_all_keys().into_iter().collect()
    };
    keys.sort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
        return Ok(());
    }

    if args.raw {
        for key in &keys {
            println!("{key}");
        }
        return Ok(());
    }

    // Keys that did not decrypt are listed as stored, without a value
    let values: BTreeMap<String, String> = prefs.get_all().into_iter().collect();
    let mut table = create_table();
    table.set_header(vec!["Key", "Value"]);
    for key in &keys {
        let value = values.get(key).map_or("<undecryptable>", String::as_str);
        table.add_row(vec![key.as_str(), value]);
    }
    println!("{table}");
    eprintln!("{} entries", keys.len());

    Ok(())
}
