use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args as ClapArgs;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use oxprefs_core::{PrefValue, PreferenceStore};

#[derive(ClapArgs)]
pub struct Args {
    /// JSON file holding a flat object of plaintext entries
    ///
    /// Strings, numbers and booleans are imported as-is; tagged values such as
    /// {"type": "long", "value": 5} keep their type.
    pub file: PathBuf,

    /// Overwrite keys that already exist in the store
    #[arg(long = "override")]
    pub override_existing: bool,

    /// Remove imported entries from the source file
    #[arg(long)]
    pub remove: bool,
}

#[instrument(level = "info", name = "cmd::import", skip_all, fields(file = %args.file.display()))]
pub fn execute(prefs: &PreferenceStore, args: &Args) -> Result<()> {
    if !args.file.is_file() {
        bail!("Import file does not exist: {}", args.file.display());
    }
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut source: Map<String, Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object", args.file.display()))?;

    let entries: Vec<(String, PrefValue)> = source
        .iter()
        .filter_map(|(key, value)| match PrefValue::from_json(value) {
            Some(value) => Some((key.clone(), value)),
            None => {
                warn!(key = %key, "Skipping entry with no preference form");
                None
            }
        })
        .collect();

    let imported = prefs.import_values(entries, args.override_existing);

    // Imports apply per entry; commit once more to have everything on disk before exiting
    if !prefs.edit().commit() {
        bail!("Failed to persist imported entries");
    }
    if args.remove {
        source.retain(|key, _| !prefs.contains(key));
        write_source(&args.file, &source)
            .with_context(|| format!("Failed to update {}", args.file.display()))?;
    }

    eprintln!("Imported {imported} entries");
    Ok(())
}

/// Replace the source file atomically with the entries left behind.
fn write_source(path: &Path, entries: &Map<String, Value>) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut temp_file, entries)?;
    temp_file.write_all(b"\n")?;
    temp_file.persist(path)?;
    Ok(())
}
