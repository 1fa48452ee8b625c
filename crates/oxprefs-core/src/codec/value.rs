//! Typed preference values and their text form.
//!
//! The store itself is a map of strings; a value's type is not recorded. The
//! accessor a caller uses decides how the stored text is parsed, and a text that
//! does not parse as the requested type yields the caller's default.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of value types a preference can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Bool,
    String,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
        }
    }

    /// Parse stored text as this kind, returning `None` on a type mismatch.
    pub fn parse(self, text: &str) -> Option<PrefValue> {
        match self {
            ValueKind::Int => i32::from_storable(text).map(PrefValue::Int),
            ValueKind::Long => i64::from_storable(text).map(PrefValue::Long),
            ValueKind::Float => f32::from_storable(text).map(PrefValue::Float),
            ValueKind::Bool => bool::from_storable(text).map(PrefValue::Bool),
            ValueKind::String => String::from_storable(text).map(PrefValue::String),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed preference value.
///
/// Serializes in tagged form, e.g. `{"type": "int", "value": 30}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PrefValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Bool(bool),
    String(String),
}

impl PrefValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PrefValue::Int(_) => ValueKind::Int,
            PrefValue::Long(_) => ValueKind::Long,
            PrefValue::Float(_) => ValueKind::Float,
            PrefValue::Bool(_) => ValueKind::Bool,
            PrefValue::String(_) => ValueKind::String,
        }
    }

    /// Convert a JSON value from a plaintext preferences file.
    ///
    /// Scalars map to the narrowest fitting type: integers to `Int` or `Long`,
    /// numbers exactly representable as `f32` to `Float`, anything else numeric
    /// to its JSON text. A tagged object (`{"type": .., "value": ..}`) is taken
    /// as written. `null`, arrays and other objects have no preference form.
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(PrefValue::Bool(*b)),
            Value::String(s) => Some(PrefValue::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(i32::try_from(i).map_or(PrefValue::Long(i), PrefValue::Int));
                }
                if n.is_u64() {
                    return Some(PrefValue::String(n.to_string()));
                }
                let narrowed = n.as_f64().map(|f| (f, f as f32));
                match narrowed {
                    Some((wide, narrow)) if f64::from(narrow) == wide => {
                        Some(PrefValue::Float(narrow))
                    }
                    _ => Some(PrefValue::String(n.to_string())),
                }
            }
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            Value::Null | Value::Array(_) => None,
        }
    }

    /// The exact text that gets encrypted and stored for this value.
    pub fn to_storable(&self) -> String {
        match self {
            PrefValue::Int(v) => v.to_storable(),
            PrefValue::Long(v) => v.to_storable(),
            PrefValue::Float(v) => v.to_storable(),
            PrefValue::Bool(v) => v.to_storable(),
            PrefValue::String(v) => v.to_storable(),
        }
    }
}

impl From<i32> for PrefValue {
    fn from(v: i32) -> Self {
        PrefValue::Int(v)
    }
}

impl From<i64> for PrefValue {
    fn from(v: i64) -> Self {
        PrefValue::Long(v)
    }
}

impl From<f32> for PrefValue {
    fn from(v: f32) -> Self {
        PrefValue::Float(v)
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        PrefValue::Bool(v)
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        PrefValue::String(v)
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        PrefValue::String(v.to_owned())
    }
}

/// A type that can be stored as preference text.
///
/// `to_storable` must be locale-independent and `from_storable` must accept
/// everything `to_storable` produces.
pub trait Storable: Sized {
    const KIND: ValueKind;

    fn to_storable(&self) -> String;

    /// Strict parse; `None` means "not a value of this type".
    fn from_storable(text: &str) -> Option<Self>;
}

impl Storable for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn to_storable(&self) -> String {
        self.to_string()
    }

    fn from_storable(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl Storable for i64 {
    const KIND: ValueKind = ValueKind::Long;

    fn to_storable(&self) -> String {
        self.to_string()
    }

    fn from_storable(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl Storable for f32 {
    const KIND: ValueKind = ValueKind::Float;

    // Display for f32 is the shortest text that parses back to the same value
    fn to_storable(&self) -> String {
        self.to_string()
    }

    fn from_storable(text: &str) -> Option<Self> {
        text.parse().ok()
    }
}

impl Storable for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_storable(&self) -> String {
        self.to_string()
    }

    /// Never fails: anything other than `"true"` (any ASCII case) is `false`.
    fn from_storable(text: &str) -> Option<Self> {
        Some(text.eq_ignore_ascii_case("true"))
    }
}

impl Storable for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_storable(&self) -> String {
        self.clone()
    }

    fn from_storable(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}
