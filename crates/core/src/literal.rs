//! Integer literals as typed at the console: decimal (`26`) or
//! `0x`-prefixed hexadecimal (`0x1A`).

use std::num::IntErrorKind;

/// A token that is not a usable integer literal.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    /// Nothing to parse.
    #[error("empty integer literal")]
    Empty,

    /// Not a decimal or `0x` hexadecimal number.
    #[error("'{0}' is not a decimal or 0x-prefixed hexadecimal integer")]
    Malformed(String),

    /// Syntactically valid but larger than 32 bits.
    #[error("'{0}' does not fit in 32 bits")]
    Overflow(String),
}

/// Parse a decimal or `0x`/`0X`-prefixed hexadecimal literal.
///
/// Negative values are rejected; every identifier and parameter on the
/// console is unsigned.
pub fn parse_int(text: &str) -> Result<u32, LiteralError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LiteralError::Empty);
    }

    let (digits, radix) = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    // from_str_radix tolerates a leading sign; the console does not.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(LiteralError::Malformed(text.to_string()));
    }

    u32::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => LiteralError::Overflow(text.to_string()),
        _ => LiteralError::Malformed(text.to_string()),
    })
}
