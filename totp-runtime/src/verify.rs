//! Windowed TOTP verification.
//!
//! Re-derives the code for each step in `[-window, +window]` around the
//! current one and compares in constant time. Every step in the window is
//! evaluated, match or not.

use subtle::{Choice, ConstantTimeEq};

use crate::secret::Secret;
use crate::totp::{derive_code_for_step, now_secs, time_step};

/// Steps accepted on either side of the current one (+/- 30 s).
pub const DEFAULT_WINDOW_STEPS: u32 = 1;

/// Check `candidate` against the codes around `unix_secs`.
///
/// Steps that would precede the epoch are skipped. A candidate that is not a
/// six-digit string simply never matches.
pub fn verify_at(secret: &Secret, candidate: &str, window_steps: u32, unix_secs: u64) -> bool {
    let current = i128::from(time_step(unix_secs));
    let window = i128::from(window_steps);
    let mut matched = Choice::from(0);

    for offset in -window..=window {
        let Ok(step) = u64::try_from(current + offset) else {
            continue;
        };
        let expected = derive_code_for_step(secret, step).to_string();
        matched |= expected.as_bytes().ct_eq(candidate.as_bytes());
    }

    matched.into()
}

/// Check `candidate` against the codes around the system clock.
pub fn verify(secret: &Secret, candidate: &str, window_steps: u32) -> bool {
    verify_at(secret, candidate, window_steps, now_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totp::derive_code;

    const SEED: &str = "3f1c9a7e52b84d06c1e3a9f27b5d8e4062a1c9f03b7e5d2148a6c0f9e3b1d7a5";
    // Start of step 56666667, whose code is 767305.
    const NOW: u64 = 1_700_000_010;

    fn secret() -> Secret {
        Secret::from_hex(SEED).unwrap()
    }

    #[test]
    fn accepts_current_code() {
        let s = secret();
        let code = derive_code(&s, NOW).to_string();
        assert!(verify_at(&s, &code, DEFAULT_WINDOW_STEPS, NOW));
        assert!(verify_at(&s, &code, 0, NOW));
    }

    #[test]
    fn self_consistent_with_clock() {
        let s = secret();
        let code = derive_code(&s, now_secs()).to_string();
        assert!(verify(&s, &code, DEFAULT_WINDOW_STEPS));
    }

    #[test]
    fn self_consistent_for_random_seeds() {
        use rand::RngCore;
        use rand::rngs::OsRng;

        for i in 0..64 {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let hex = if i % 2 == 0 {
                hex::encode(bytes)
            } else {
                hex::encode_upper(bytes)
            };
            let s = Secret::from_hex(&hex).unwrap();
            let at = OsRng.next_u64() % 4_000_000_000;

            let code = derive_code(&s, at).to_string();
            assert_eq!(code.len(), 6);
            assert!(verify_at(&s, &code, DEFAULT_WINDOW_STEPS, at));

            let code = derive_code(&s, now_secs()).to_string();
            assert!(verify(&s, &code, DEFAULT_WINDOW_STEPS));
        }
    }

    #[test]
    fn window_boundary() {
        let s = secret();
        let code = derive_code(&s, NOW).to_string();
        assert_eq!(code, "767305");

        assert!(verify_at(&s, &code, 1, NOW + 29));
        assert!(verify_at(&s, &code, 1, NOW - 29));
        assert!(!verify_at(&s, &code, 0, NOW + 31));
    }

    #[test]
    fn neighbouring_steps() {
        let s = secret();
        // 150134 is two steps back, 941275 one step ahead.
        assert!(!verify_at(&s, "150134", 1, NOW));
        assert!(verify_at(&s, "150134", 2, NOW));
        assert!(verify_at(&s, "941275", 1, NOW));
        assert!(!verify_at(&s, "941275", 0, NOW));
    }

    #[test]
    fn rejects_codes_outside_window() {
        let s = secret();
        let window: Vec<String> = (-1i64..=1)
            .map(|o| derive_code(&s, (NOW as i64 + o * 30) as u64).to_string())
            .collect();
        assert!(!window.contains(&"000000".to_string()));
        assert!(!verify_at(&s, "000000", 1, NOW));
        assert!(!verify_at(&s, "999999", 1, NOW));
    }

    #[test]
    fn malformed_candidates_do_not_match() {
        let s = secret();
        assert!(!verify_at(&s, "", 1, NOW));
        assert!(!verify_at(&s, "76730", 1, NOW));
        assert!(!verify_at(&s, "7673050", 1, NOW));
        assert!(!verify_at(&s, "abcdef", 1, NOW));
    }

    #[test]
    fn window_near_epoch_skips_negative_steps() {
        let s = secret();
        let code = derive_code(&s, 0).to_string();
        assert!(verify_at(&s, &code, 5, 0));
    }
}
