//! Binary encoding helpers.
//!
//! Anchors reach the indexer either as base64 data entries (legacy data
//! transactions) or as base58 strings (anchor transactions). Both are stored
//! under their hex representation.

use base64::Engine;

use crate::constants::BASE64_VALUE_PREFIX;
use crate::error::{CoreError, Result};

/// Hex-encode bytes (lowercase, no prefix).
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, with or without `0x` prefix.
pub fn hex_decode(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim_start_matches("0x")).map_err(|_| CoreError::InvalidHex)
}

/// Decode standard (padded) base64.
pub fn base64_decode(input: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| CoreError::InvalidBase64(e.to_string()))
}

/// Decode base58 (bitcoin alphabet).
pub fn base58_decode(input: &str) -> Result<Vec<u8>> {
    bs58::decode(input)
        .into_vec()
        .map_err(|e| CoreError::InvalidBase58(e.to_string()))
}

/// Convert a `base64:`-prefixed data value into a hex hash.
pub fn anchor_hash_from_base64(value: &str) -> Result<String> {
    let encoded = value.strip_prefix(BASE64_VALUE_PREFIX).unwrap_or(value);
    Ok(hex_encode(&base64_decode(encoded)?))
}

/// Convert a base58 anchor into a hex hash.
pub fn anchor_hash_from_base58(value: &str) -> Result<String> {
    Ok(hex_encode(&base58_decode(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_hash_from_base64() {
        // "hello" -> aGVsbG8=
        let hash = anchor_hash_from_base64("base64:aGVsbG8=").unwrap();
        assert_eq!(hash, "68656c6c6f");
    }

    #[test]
    fn test_anchor_hash_from_base64_without_prefix() {
        let hash = anchor_hash_from_base64("aGVsbG8=").unwrap();
        assert_eq!(hash, "68656c6c6f");
    }

    #[test]
    fn test_anchor_hash_from_base64_invalid() {
        assert!(matches!(
            anchor_hash_from_base64("base64:not base64!"),
            Err(CoreError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_anchor_hash_from_base58() {
        // base58("hello") = Cn8eVZg
        let hash = anchor_hash_from_base58("Cn8eVZg").unwrap();
        assert_eq!(hash, "68656c6c6f");
    }

    #[test]
    fn test_anchor_hash_from_base58_invalid() {
        // '0' is not part of the bitcoin alphabet
        assert!(matches!(
            anchor_hash_from_base58("0OIl"),
            Err(CoreError::InvalidBase58(_))
        ));
    }

    #[test]
    fn test_hex_decode_with_prefix() {
        assert_eq!(hex_decode("0x0aff").unwrap(), vec![0x0a, 0xff]);
        assert!(hex_decode("zz").is_err());
    }
}
