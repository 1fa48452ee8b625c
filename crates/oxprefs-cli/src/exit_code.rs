//! Process exit codes.
//!
//! 2 is left to clap, which uses it for usage errors.

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
/// Key, file or store entry does not exist.
pub const NOT_FOUND: u8 = 3;
/// Missing password or unusable KDF parameters.
pub const CONFIG_ERROR: u8 = 4;
/// Store file is corrupt or the store name is unusable.
pub const STORE_INVALID: u8 = 5;
pub const PERMISSION_DENIED: u8 = 6;
