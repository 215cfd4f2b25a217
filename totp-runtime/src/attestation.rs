//! Sign-and-wrap attestation.
//!
//! The holder signs a message (typically a commit hash) with RSA-PSS, SHA-256
//! and the largest salt the key allows, then encrypts the signature to the
//! counterpart's public key with the same OAEP configuration the seed channel
//! uses. The counterpart unwraps and checks the signature out of band.
//!
//! OAEP-SHA256 carries at most `k - 66` bytes, so the counterpart modulus must
//! be larger than the signer's: a 2048-bit signature needs a 3072-bit (or
//! larger) counterpart key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::AttestationError;

const HASH_LEN: usize = 32;

/// Largest PSS salt for a modulus of `modulus_bits`: `emLen - hLen - 2`.
fn max_salt_len(modulus_bits: usize) -> usize {
    let em_len = (modulus_bits - 1).div_ceil(8);
    em_len.saturating_sub(HASH_LEN + 2)
}

/// RSA-PSS signature over `message` with maximum salt length.
pub fn sign(message: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>, AttestationError> {
    let hashed = Sha256::digest(message);
    let salt_len = max_salt_len(private_key.n().bits());
    private_key
        .sign_with_rng(&mut OsRng, Pss::new_with_salt::<Sha256>(salt_len), &hashed)
        .map_err(|e| AttestationError::Signing(e.to_string()))
}

/// [`sign`], base64-encoded. The unwrapped form, for counterparts that take
/// the bare signature.
pub fn sign_encoded(message: &[u8], private_key: &RsaPrivateKey) -> Result<String, AttestationError> {
    sign(message, private_key).map(|signature| BASE64.encode(signature))
}

/// Check a maximum-salt PSS signature. Counterpart side.
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &RsaPublicKey) -> bool {
    let hashed = Sha256::digest(message);
    let salt_len = max_salt_len(public_key.n().bits());
    public_key
        .verify(Pss::new_with_salt::<Sha256>(salt_len), &hashed, signature)
        .is_ok()
}

/// Encrypt `signature` to `counterpart` and base64 it for transport.
pub fn wrap_for_transport(
    signature: &[u8],
    counterpart: &RsaPublicKey,
) -> Result<String, AttestationError> {
    let ciphertext = counterpart
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), signature)
        .map_err(|e| AttestationError::Wrap(e.to_string()))?;
    Ok(BASE64.encode(ciphertext))
}

/// Sign `message` and wrap the signature for `counterpart`.
pub fn attest(
    message: &[u8],
    private_key: &RsaPrivateKey,
    counterpart: &RsaPublicKey,
) -> Result<String, AttestationError> {
    let signature = sign(message, private_key)?;
    let envelope = wrap_for_transport(&signature, counterpart)?;
    tracing::debug!(
        signature_len = signature.len(),
        envelope_len = envelope.len(),
        "Produced attestation envelope"
    );
    Ok(envelope)
}
