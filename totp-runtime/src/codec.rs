//! Hex and base32 conversions for seeds.
//!
//! Seeds travel as 64-character hex strings; the TOTP engine works on raw
//! bytes and authenticator apps want RFC 4648 base32.

use crate::error::CodecError;

/// Length of a provisioned seed in hex characters (32 bytes).
pub const SEED_HEX_LEN: usize = 64;

/// Decode a hex string into bytes. Upper and lower case are both accepted.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(hex).map_err(|e| CodecError::MalformedHex(e.to_string()))
}

/// Encode bytes as RFC 4648 base32, padded to a multiple of 8 characters.
pub fn bytes_to_base32(bytes: &[u8]) -> String {
    data_encoding::BASE32.encode(bytes)
}

/// Encode bytes as RFC 4648 base32 without `=` padding (otpauth URIs).
pub fn bytes_to_base32_unpadded(bytes: &[u8]) -> String {
    data_encoding::BASE32_NOPAD.encode(bytes)
}

/// True when `s` is exactly [`SEED_HEX_LEN`] hex digits.
pub fn is_hex_seed(s: &str) -> bool {
    s.len() == SEED_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decodes_mixed_case() {
        assert_eq!(hex_to_bytes("00ffAb").unwrap(), vec![0x00, 0xff, 0xab]);
    }

    #[test]
    fn hex_rejects_odd_length() {
        assert!(matches!(
            hex_to_bytes("abc"),
            Err(CodecError::MalformedHex(_))
        ));
    }

    #[test]
    fn hex_rejects_non_hex() {
        assert!(hex_to_bytes("zz").is_err());
    }

    #[test]
    fn base32_is_padded_to_eight() {
        assert_eq!(bytes_to_base32(b"f"), "MY======");
        assert_eq!(bytes_to_base32(b"foobar"), "MZXW6YTBOI======");
        assert_eq!(bytes_to_base32(b""), "");
    }

    #[test]
    fn base32_of_seed() {
        let bytes = hex_to_bytes(
            "3f1c9a7e52b84d06c1e3a9f27b5d8e4062a1c9f03b7e5d2148a6c0f9e3b1d7a5",
        )
        .unwrap();
        let encoded = bytes_to_base32(&bytes);
        assert_eq!(
            encoded,
            "H4OJU7SSXBGQNQPDVHZHWXMOIBRKDSPQHN7F2IKIU3APTY5R26SQ===="
        );
        assert_eq!(encoded.len() % 8, 0);
        assert_eq!(
            bytes_to_base32_unpadded(&bytes),
            "H4OJU7SSXBGQNQPDVHZHWXMOIBRKDSPQHN7F2IKIU3APTY5R26SQ"
        );
    }

    #[test]
    fn seed_shape() {
        assert!(is_hex_seed(&"a".repeat(64)));
        assert!(is_hex_seed(&"AbC0".repeat(16)));
        assert!(!is_hex_seed(&"a".repeat(63)));
        assert!(!is_hex_seed(&"a".repeat(65)));
        assert!(!is_hex_seed(&format!("{}g", "a".repeat(63))));
    }
}
