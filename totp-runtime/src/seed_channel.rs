//! One-time seed delivery over RSA-OAEP.
//!
//! The issuer encrypts a 64-character hex seed to the holder's public key
//! (OAEP, SHA-256 for both the digest and MGF1, empty label) and ships the
//! ciphertext as base64. The holder decrypts it here, validates the shape and
//! hands a [`Secret`] to the store.
//!
//! Every stage has its own [`SeedError`] variant for local logs, but
//! [`provision`] callers facing a network must report one generic failure.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, SeedError};
use crate::secret::Secret;
use crate::store::SecretStore;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Decrypt a base64 envelope into a validated seed.
///
/// ASCII whitespace anywhere in the envelope is ignored, so line-wrapped
/// `openssl base64` output decodes the same as a single line.
pub fn decrypt_seed(envelope: &str, private_key: &RsaPrivateKey) -> std::result::Result<Secret, SeedError> {
    let compact: Vec<u8> = envelope
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let ciphertext = BASE64
        .decode(&compact)
        .map_err(|_| SeedError::EnvelopeDecode)?;

    let plaintext = private_key
        .decrypt_blinded(&mut OsRng, oaep(), &ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| SeedError::Decryption)?;

    let hex = std::str::from_utf8(&plaintext).map_err(|_| SeedError::Encoding)?;
    Secret::from_hex(hex)
}

/// Encrypt a seed for `public_key`. Issuer-side counterpart of
/// [`decrypt_seed`]; OAEP is randomized so every call yields a new envelope.
pub fn encrypt_seed(secret: &Secret, public_key: &RsaPublicKey) -> std::result::Result<String, SeedError> {
    let ciphertext = public_key
        .encrypt(&mut OsRng, oaep(), secret.expose_hex().as_bytes())
        .map_err(|e| SeedError::Encryption(e.to_string()))?;
    Ok(BASE64.encode(ciphertext))
}

/// Decrypt an envelope and atomically replace the stored seed with it.
///
/// Nothing is written unless decryption and validation both succeed.
pub fn provision(
    envelope: &str,
    private_key: &RsaPrivateKey,
    store: &dyn SecretStore,
) -> Result<()> {
    let secret = decrypt_seed(envelope, private_key).inspect_err(|e| {
        tracing::debug!(reason = %e, "Rejected seed envelope");
    })?;
    store.put(secret)?;
    tracing::info!("Seed provisioned");
    Ok(())
}
