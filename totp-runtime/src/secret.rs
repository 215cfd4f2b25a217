//! The provisioned TOTP seed.

use std::fmt;

use zeroize::Zeroizing;

use crate::codec::{hex_to_bytes, is_hex_seed};
use crate::error::SeedError;

/// A validated 32-byte seed, held as its 64-character hex form plus the
/// decoded bytes. Both buffers are wiped on drop.
#[derive(Clone)]
pub struct Secret {
    hex: Zeroizing<String>,
    bytes: Zeroizing<Vec<u8>>,
}

impl Secret {
    /// Validate and wrap a hex seed.
    pub fn from_hex(hex: &str) -> Result<Self, SeedError> {
        if !is_hex_seed(hex) {
            return Err(SeedError::InvalidSeedFormat);
        }
        let bytes = hex_to_bytes(hex).map_err(|_| SeedError::InvalidSeedFormat)?;
        Ok(Self {
            hex: Zeroizing::new(hex.to_string()),
            bytes: Zeroizing::new(bytes),
        })
    }

    /// The seed exactly as provisioned.
    pub fn expose_hex(&self) -> &str {
        &self.hex
    }

    /// The raw key bytes fed to HMAC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_slice() == other.bytes.as_slice()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}
