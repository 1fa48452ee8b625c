//! Encoding layers between logical preferences and stored tokens

pub mod token;
pub mod transport;
pub mod value;

// Re-export commonly used types
pub use token::TokenCodec;
pub use value::{PrefValue, Storable, ValueKind};
