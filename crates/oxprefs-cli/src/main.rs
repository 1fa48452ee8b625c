#![deny(unsafe_code)]

mod auth;
mod commands;
mod exit_code;
mod output;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oxprefs_core::crypto::CryptoError;
use oxprefs_core::store::{FileBackend, StoreError};
use oxprefs_core::{DEFAULT_STORE_NAME, KdfParams, PreferenceConfig, PreferenceStore, PrefsError};

use crate::commands::{KeyNotFound, get, import, keys, put, rm, token, wipe};

/// Encrypted key-value preferences from the command line
#[derive(Parser)]
#[command(name = "oxprefs")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Store and read a typed value
    oxprefs put launches 3 --type int
    oxprefs get launches --type int

    # Pipe the password from a secret manager
    echo \"$SECRET\" | oxprefs --password-stdin keys

    # Migrate a plaintext JSON object into the encrypted store
    oxprefs import legacy.json --remove
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the store files
    #[arg(long, env = "OXPREFS_DIR", global = true)]
    dir: Option<PathBuf>,

    /// Store name (one JSON file per store)
    #[arg(long, env = "OXPREFS_STORE", default_value = DEFAULT_STORE_NAME, global = true)]
    store: String,

    /// Store password (insecure, prefer --password-stdin or OXPREFS_PASSWORD)
    #[arg(long, env = "OXPREFS_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Read password from stdin (single line)
    #[arg(long, conflicts_with = "password", global = true)]
    password_stdin: bool,

    /// scrypt cost (log2 N) used to derive the store key
    #[arg(long, env = "OXPREFS_KDF_LOG_N", hide = true, global = true)]
    kdf_log_n: Option<u8>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a value
    Get(get::Args),

    /// Write a value
    Put(put::Args),

    /// Remove a value
    Rm(rm::Args),

    /// List stored keys
    Keys(keys::Args),

    /// Import entries from a plaintext JSON object
    Import(import::Args),

    /// Delete every entry of the store
    Wipe(wipe::Args),

    /// Encrypt a string into a storage token
    Encrypt(token::EncryptArgs),

    /// Decrypt a storage token
    Decrypt(token::DecryptArgs),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let prefs = open_store(&cli)?;

    match &cli.command {
        Commands::Get(args) => get::execute(&prefs, args),
        Commands::Put(args) => put::execute(&prefs, args),
        Commands::Rm(args) => rm::execute(&prefs, args),
        Commands::Keys(args) => keys::execute(&prefs, args),
        Commands::Import(args) => import::execute(&prefs, args),
        Commands::Wipe(args) => wipe::execute(&prefs, args),
        Commands::Encrypt(args) => token::encrypt(&prefs, args),
        Commands::Decrypt(args) => token::decrypt(&prefs, args),
    }
}

/// Open the file-backed store selected by the global options.
fn open_store(cli: &Cli) -> Result<PreferenceStore> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => default_store_dir()?,
    };
    let password = get_password(cli)?;

    let mut kdf_params = KdfParams::default();
    if let Some(log_n) = cli.kdf_log_n {
        kdf_params.log_n = log_n;
    }

    tracing::debug!(dir = %dir.display(), store = %cli.store, "Opening store");
    PreferenceConfig::builder()
        .password(password)
        .store_name(&cli.store)
        .kdf_params(kdf_params)
        .provider(Arc::new(FileBackend::new(dir)))
        .build()
        .with_context(|| format!("Failed to open store '{}'", cli.store))
}

fn default_store_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "oxprefs")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Could not determine a data directory; pass --dir or set OXPREFS_DIR")
}

/// Get password using the priority chain:
/// 1. --password-stdin
/// 2. --password / OXPREFS_PASSWORD
/// 3. Interactive prompt
fn get_password(cli: &Cli) -> Result<String> {
    if cli.password_stdin {
        read_password_from_stdin()
    } else if let Some(ref password) = cli.password {
        Ok(password.clone())
    } else {
        auth::prompt_password()
    }
}

/// Read password from stdin (first line only)
fn read_password_from_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        anyhow::bail!(
            "--password-stdin requires password to be piped in.\n\
             Example: echo \"$SECRET\" | oxprefs --password-stdin keys"
        );
    }

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;

    let password = password.trim_end_matches('\n').trim_end_matches('\r');
    if password.is_empty() {
        anyhow::bail!("Password from stdin is empty");
    }

    Ok(password.to_string())
}

/// Set up tracing/logging based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Map an error chain to a process exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<KeyNotFound>().is_some() {
            return exit_code::NOT_FOUND;
        }

        if let Some(prefs_err) = cause.downcast_ref::<PrefsError>() {
            match prefs_err {
                PrefsError::MissingPassword
                | PrefsError::SingletonNotConfigured { .. }
                | PrefsError::Crypto(
                    CryptoError::InvalidKdfParams(_) | CryptoError::KeyDerivationFailed(_),
                ) => return exit_code::CONFIG_ERROR,
                // Transparent wrapper, so the store error never shows up in the chain itself
                PrefsError::Store(store_err) => {
                    if let Some(code) = categorize_store_error(store_err) {
                        return code;
                    }
                }
                PrefsError::Crypto(_) => {}
            }
        }

        if let Some(store_err) = cause.downcast_ref::<StoreError>()
            && let Some(code) = categorize_store_error(store_err)
        {
            return code;
        }

        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::PermissionDenied => return exit_code::PERMISSION_DENIED,
                io::ErrorKind::NotFound => return exit_code::NOT_FOUND,
                _ => {}
            }
        }
    }

    exit_code::GENERAL_ERROR
}

fn categorize_store_error(e: &StoreError) -> Option<u8> {
    match e {
        StoreError::Corrupt { .. } | StoreError::InvalidName(_) => Some(exit_code::STORE_INVALID),
        StoreError::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            Some(exit_code::PERMISSION_DENIED)
        }
        StoreError::Io { .. } => None,
    }
}
