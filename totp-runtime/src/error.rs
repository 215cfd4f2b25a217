use thiserror::Error;

/// Hex/base32 codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Odd length or a character outside `0-9a-fA-F`.
    #[error("malformed hex: {0}")]
    MalformedHex(String),
}

/// Failures while turning a received envelope into a validated secret.
///
/// The variants exist for local diagnostics only. Callers facing the network
/// must collapse all of them into a single opaque failure so the distinction
/// between stages never reaches a client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    /// The transport encoding (base64) of the envelope is malformed.
    #[error("envelope is not valid base64")]
    EnvelopeDecode,
    /// RSA-OAEP rejected the ciphertext (wrong key, corruption, tampering).
    #[error("envelope could not be decrypted")]
    Decryption,
    /// The decrypted plaintext is not UTF-8.
    #[error("decrypted seed is not valid UTF-8")]
    Encoding,
    /// The plaintext is not a 64-character hex string.
    #[error("decrypted seed must be 64 hex characters")]
    InvalidSeedFormat,
    /// Encrypting a seed for a public key failed (issuer side).
    #[error("seed encryption failed: {0}")]
    Encryption(String),
}

/// Failures of the sign-and-wrap attestation primitive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttestationError {
    /// RSA-PSS signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
    /// RSA-OAEP wrapping of the signature failed, typically because the
    /// counterpart modulus is too small to carry the signature.
    #[error("wrapping signature failed: {0}")]
    Wrap(String),
}

/// PEM key loading failures.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("reading key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {kind} key: {reason}")]
    Parse { kind: &'static str, reason: String },
}

/// Errors returned by runtime operations.
#[derive(Debug, Error)]
pub enum TotpError {
    /// No secret has been provisioned yet.
    #[error("seed not decrypted yet")]
    SecretNotProvisioned,
    /// A verification request carried no candidate code.
    #[error("missing code")]
    MissingCandidate,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    #[error(transparent)]
    Key(#[from] KeyError),
    /// Secret store read/write failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// Request to the issuer failed.
    #[error("http error: {0}")]
    Http(String),
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convert TotpError to String for CLI output.
impl From<TotpError> for String {
    fn from(err: TotpError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, TotpError>;
