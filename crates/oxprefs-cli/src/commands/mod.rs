pub mod get;
pub mod import;
pub mod keys;
pub mod put;
pub mod rm;
pub mod token;
pub mod wipe;

use std::fmt;

use anyhow::{Result, anyhow};
use clap::ValueEnum;

use oxprefs_core::{PrefValue, ValueKind};

/// Value type selected with `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Int,
    Long,
    Float,
    Bool,
    String,
}

impl From<TypeArg> for ValueKind {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Int => ValueKind::Int,
            TypeArg::Long => ValueKind::Long,
            TypeArg::Float => ValueKind::Float,
            TypeArg::Bool => ValueKind::Bool,
            TypeArg::String => ValueKind::String,
        }
    }
}

/// Parse command-line text as a value of `kind`.
///
/// Stricter than reading: booleans must be `true` or `false`.
pub fn parse_value(kind: ValueKind, text: &str) -> Result<PrefValue> {
    let parsed = match kind {
        ValueKind::Bool => text.parse::<bool>().ok().map(PrefValue::Bool),
        other => other.parse(text),
    };
    parsed.ok_or_else(|| anyhow!("'{text}' is not a valid {kind} value"))
}

/// The requested key has no readable value.
#[derive(Debug)]
pub struct KeyNotFound(pub String);

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key not found: {}", self.0)
    }
}

impl std::error::Error for KeyNotFound {}
