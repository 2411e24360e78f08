//! 64-bit key identifiers.
//!
//! A key is identified by the low 64 bits of its fingerprint, carried in
//! the record stream as 16 uppercase hex digits. The identifier is stored
//! as two 32-bit halves; each half is assembled from its two 4-digit hex
//! quads as `quad(0..4) * 65536 + quad(4..8)`, which is also how every
//! report file renders it (`HHHHHHHH HHHHHHHH`).

use std::fmt;

use serde::Serialize;

/// Errors from parsing an identifier field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyIdError {
    /// The identifier field is not exactly 16 hex digits.
    #[error("identifier field is not 16 hex digits: {0:?}")]
    InvalidHex(String),
}

/// A stable 64-bit key identifier, split into two 32-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct KeyId {
    /// High half (first 8 hex digits of the identifier field).
    pub hi: u32,
    /// Low half (last 8 hex digits). Per-key report files are named by
    /// this half.
    pub lo: u32,
}

impl KeyId {
    /// Build an identifier from its two halves.
    #[must_use]
    pub const fn new(hi: u32, lo: u32) -> Self {
        Self { hi, lo }
    }

    /// Parse a 16-hex-digit identifier field.
    ///
    /// # Errors
    ///
    /// Returns [`KeyIdError::InvalidHex`] if `field` is not exactly 16
    /// hex digits. Malformed identifiers are never truncated to partial
    /// values — a garbage identifier would silently break signer
    /// resolution later.
    pub fn parse_hex16(field: &[u8]) -> Result<Self, KeyIdError> {
        let invalid = || KeyIdError::InvalidHex(String::from_utf8_lossy(field).into_owned());
        if field.len() != 16 {
            return Err(invalid());
        }
        let hi = parse_half(&field[..8]).ok_or_else(invalid)?;
        let lo = parse_half(&field[8..]).ok_or_else(invalid)?;
        Ok(Self { hi, lo })
    }

    /// Pack both halves into one `u64`.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }
}

/// Assemble one 32-bit half from 8 hex digits: `quad * 65536 + quad`.
fn parse_half(half: &[u8]) -> Option<u32> {
    let quad = |bytes: &[u8]| {
        let s = std::str::from_utf8(bytes).ok()?;
        u32::from_str_radix(s, 16).ok()
    };
    let high = quad(&half[..4])?;
    let low = quad(&half[4..])?;
    Some(high * 65536 + low)
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} {:08X}", self.hi, self.lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_halves() {
        let id = KeyId::parse_hex16(b"0123456789ABCDEF").expect("valid hex");
        assert_eq!(id.hi, 0x0123_4567);
        assert_eq!(id.lo, 0x89AB_CDEF);
        assert_eq!(id.as_u64(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn half_assembly_matches_quad_arithmetic() {
        // 0x0001 * 65536 + 0x0002 per half.
        let id = KeyId::parse_hex16(b"0001000200030004").expect("valid hex");
        assert_eq!(id.hi, 0x0001 * 65536 + 0x0002);
        assert_eq!(id.lo, 0x0003 * 65536 + 0x0004);
    }

    #[test]
    fn lowercase_hex_accepted() {
        let upper = KeyId::parse_hex16(b"00DEADBEEF00CAFE").expect("valid hex");
        let lower = KeyId::parse_hex16(b"00deadbeef00cafe").expect("valid hex");
        assert_eq!(upper, lower);
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            KeyId::parse_hex16(b"0123456789ABCDEG"),
            Err(KeyIdError::InvalidHex(_))
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(KeyId::parse_hex16(b"0123").is_err());
    }

    #[test]
    fn display_is_two_padded_halves() {
        let id = KeyId::new(0xAB, 0x1234_5678);
        assert_eq!(id.to_string(), "000000AB 12345678");
    }
}
