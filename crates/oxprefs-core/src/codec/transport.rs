//! Transport encoding for cipher output.
//!
//! Standard base64 contains `+`, `/` and `=`, which some key-value formats treat
//! specially. Each of them is replaced by a two-character escape starting with
//! `-`. Because `-` never appears in standard base64, the escapes cannot collide
//! with genuine cipher output and decoding is an exact inverse.

/// Escape table, applied in order on encode and in reverse order on decode.
const ESCAPES: [(&str, &str); 3] = [("+", "-p"), ("/", "-s"), ("=", "-e")];

/// Character introducing every escape sequence.
pub const ESCAPE_CHAR: char = '-';

/// Replace storage-unsafe base64 characters with their escape sequences.
pub fn encode(raw: &str) -> String {
    ESCAPES
        .iter()
        .fold(raw.to_owned(), |acc, (from, to)| acc.replace(from, to))
}

/// Restore the original cipher output from a token.
///
/// Only the inverse of [`encode`] is guaranteed; text that was never produced by
/// `encode` decodes to something the cipher will reject.
pub fn decode(token: &str) -> String {
    ESCAPES
        .iter()
        .rev()
        .fold(token.to_owned(), |acc, (from, to)| acc.replace(to, from))
}

/// Whether `s` only uses the token alphabet (ASCII letters, digits, `-`).
pub fn is_token(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == ESCAPE_CHAR)
}
