//! RFC 6238 TOTP: HOTP (RFC 4226, HMAC-SHA1) over `floor(t / 30)`.
//!
//! Period and digit count are fixed for this service.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::secret::Secret;

/// Seconds per time step.
pub const PERIOD_SECS: u64 = 30;

/// Digits in a code.
pub const DIGITS: usize = 6;

const MODULUS: u32 = 1_000_000;

/// A one-time code. Rendered left-zero-padded to [`DIGITS`] characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Code(u32);

impl Code {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = DIGITS)
    }
}

/// Seconds since the Unix epoch. A clock set before 1970 reads as 0.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Time step index for `unix_secs`.
pub fn time_step(unix_secs: u64) -> u64 {
    unix_secs / PERIOD_SECS
}

/// Seconds left in the period containing `unix_secs`, in `1..=30`.
pub fn seconds_remaining(unix_secs: u64) -> u64 {
    PERIOD_SECS - (unix_secs % PERIOD_SECS)
}

/// HOTP value for raw key bytes and a counter.
pub fn hotp(key: &[u8], counter: u64) -> Code {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 section 5.3).
    let offset = usize::from(digest[19] & 0x0f);
    let p = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    Code(p % MODULUS)
}

/// Code for `secret` at step `counter`.
pub fn derive_code_for_step(secret: &Secret, counter: u64) -> Code {
    hotp(secret.as_bytes(), counter)
}

/// Code for `secret` at `unix_secs`.
pub fn derive_code(secret: &Secret, unix_secs: u64) -> Code {
    derive_code_for_step(secret, time_step(unix_secs))
}

/// Current code and the seconds it stays valid.
pub fn current_code(secret: &Secret) -> (Code, u64) {
    let now = now_secs();
    (derive_code(secret, now), seconds_remaining(now))
}

/// `otpauth://` enrolment URI for authenticator apps.
pub fn otpauth_uri(secret: &Secret, label: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        percent_encode(issuer),
        percent_encode(label),
        crate::codec::bytes_to_base32_unpadded(secret.as_bytes()),
        percent_encode(issuer),
        DIGITS,
        PERIOD_SECS,
    )
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'@') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
