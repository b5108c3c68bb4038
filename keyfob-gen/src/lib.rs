//! # Keyfob Gen(erator)
//!
//! Generator component of **Keyfob**. It creates OTPs for any [`Token`] of the [`keyfob_core`]
//! component, using the HMAC implementation of [`keyfob_hash`].
//!
//! Counter based tokens are advanced and persisted through [`Persist`] **before** their code is
//! derived, so that a crash can never reveal the same code twice.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::{
    fmt::{self, Display},
    time::{SystemTimeError, UNIX_EPOCH},
};

use keyfob_core::{ExposeSecret, Persist, DEFAULT_PERIOD};
pub use keyfob_core::{Algorithm, Digits, Otp, Token};
use tracing::debug;

/// Errors that can occur when generating an OTP.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to get a timestamp from the system.
    #[error("failed to get time since unix epoch")]
    Time(#[from] SystemTimeError),
    /// The advanced HOTP counter couldn't be saved, so no code was derived.
    #[error("failed to persist the advanced counter")]
    Persist(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The HOTP counter reached its maximum and can't advance without reusing codes.
    #[error("the HOTP counter is exhausted")]
    CounterExhausted,
}

/// Time range in Unix seconds, in which a code is shown. `start` is inclusive and `until`
/// exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub until: u64,
}

impl Window {
    #[must_use]
    pub const fn contains(&self, now: u64) -> bool {
        self.start <= now && now < self.until
    }

    /// Seconds left until the window closes.
    #[must_use]
    pub const fn remaining(&self, now: u64) -> u64 {
        self.until.saturating_sub(now)
    }
}

/// A single code together with the time it's valid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Code {
    pub code: OtpCode,
    pub window: Window,
}

/// Result of one derivation. Time based tokens get the code of the upcoming period as well, so
/// the display can switch over without deriving again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codes {
    pub current: Code,
    pub next: Option<Code>,
}

impl Codes {
    /// The code to show at `now`, if any is still valid.
    #[must_use]
    pub fn active(&self, now: u64) -> Option<&Code> {
        std::iter::once(&self.current)
            .chain(self.next.as_ref())
            .find(|code| code.window.contains(now))
    }

    /// Point in time after which all codes are expired.
    #[must_use]
    pub fn expires(&self) -> u64 {
        self.next.as_ref().unwrap_or(&self.current).window.until
    }
}

/// Generate the codes for `token` at the current system time.
///
/// For [`Otp::Hotp`] tokens the counter is advanced and saved through `persist` first. The
/// returned code is derived from the counter value before the increment.
pub fn generate<P: Persist>(token: &mut Token, persist: &mut P) -> Result<Codes, Error> {
    let now = UNIX_EPOCH.elapsed()?.as_secs();
    generate_at(token, persist, now)
}

/// Same as [`generate`] but with an explicit point in time in Unix seconds.
pub fn generate_at<P: Persist>(
    token: &mut Token,
    persist: &mut P,
    now: u64,
) -> Result<Codes, Error> {
    let period = token.effective_period();

    match token.otp {
        Otp::Hotp { counter } => {
            let advanced = counter.checked_add(1).ok_or(Error::CounterExhausted)?;

            token.otp = Otp::Hotp { counter: advanced };
            if let Err(e) = persist.persist(token) {
                token.otp = Otp::Hotp { counter };
                return Err(Error::Persist(Box::new(e)));
            }

            debug!(id = token.id, counter = advanced, "advanced HOTP counter");

            let code = hotp(
                token.secret.expose_secret(),
                token.algorithm,
                counter,
                token.digits,
            );

            Ok(Codes {
                current: Code {
                    code,
                    window: Window {
                        start: now,
                        until: now.saturating_add(period),
                    },
                },
                next: None,
            })
        }
        Otp::Totp => Ok(totp(
            token.secret.expose_secret(),
            token.algorithm,
            period,
            token.digits,
            now,
        )),
    }
}

/// Derive the HOTP code for `counter` (RFC 4226).
#[must_use]
pub fn hotp(secret: &[u8], algorithm: Algorithm, counter: u64, digits: Digits) -> OtpCode {
    let digest = keyfob_hash::hmac(algorithm, secret, &counter.to_be_bytes());

    OtpCode {
        code: digit(&digest, digits),
        digits,
    }
}

/// Derive the TOTP codes of the period containing `now` and the one after (RFC 6238). A
/// `period` of `0` is replaced with the default of 30 seconds. Window bounds saturate at
/// `u64::MAX`.
#[must_use]
pub fn totp(secret: &[u8], algorithm: Algorithm, period: u64, digits: Digits, now: u64) -> Codes {
    let period = if period == 0 { DEFAULT_PERIOD } else { period };
    let slot = now / period;

    let code_at = |slot: u64| Code {
        code: hotp(secret, algorithm, slot, digits),
        window: Window {
            start: slot.saturating_mul(period),
            until: slot.saturating_add(1).saturating_mul(period),
        },
    };

    Codes {
        current: code_at(slot),
        next: Some(code_at(slot.saturating_add(1))),
    }
}

/// Dynamic truncation of an HMAC result. The offset is capped so the four bytes stay inside
/// digests shorter than 19 bytes (MD5).
fn digit(bytes: &[u8], digits: Digits) -> u32 {
    let offset = usize::from(bytes[bytes.len() - 1] & 0xf).min(bytes.len() - 4);
    let bin_code = (u32::from(bytes[offset]) & 0x7f) << 24
        | u32::from(bytes[offset + 1]) << 16
        | u32::from(bytes[offset + 2]) << 8
        | u32::from(bytes[offset + 3]);

    bin_code % digits.modulus()
}

/// A generated OTP code that can be used to verify identity against a service.
///
/// The numeric value may have less digits than required, so it must be padded with zeroes in the
/// final representation. Call `to_string()` on an instance to get the final code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OtpCode {
    pub code: u32,
    pub digits: Digits,
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:01$}", self.code, usize::from(u8::from(self.digits)))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use keyfob_core::{fingerprint, Key};
    use pretty_assertions::assert_eq;

    use super::*;

    const RFC_SHA1: &[u8] = b"12345678901234567890";
    const RFC_SHA256: &[u8] = b"12345678901234567890123456789012";
    const RFC_SHA512: &[u8] =
        b"1234567890123456789012345678901234567890123456789012345678901234";

    #[derive(Default)]
    struct Recorder(Vec<Token>);

    impl Persist for Recorder {
        type Error = io::Error;

        fn persist(&mut self, token: &Token) -> Result<(), Self::Error> {
            self.0.push(token.clone());
            Ok(())
        }
    }

    struct Failing;

    impl Persist for Failing {
        type Error = io::Error;

        fn persist(&mut self, _: &Token) -> Result<(), Self::Error> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn token(otp: Otp) -> Token {
        Token {
            issuer: "ACME".to_owned(),
            name: "alice".to_owned(),
            secret: Key::new(RFC_SHA1.to_vec()),
            id: fingerprint("ACME:alice"),
            digits: Digits::Six,
            algorithm: Algorithm::Sha1,
            period: 30,
            otp,
        }
    }

    #[test]
    fn digit() {
        let bytes = [
            0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50, 0xef, 0x7f, 0x19,
            0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
        ];

        assert_eq!(872_921, super::digit(&bytes, Digits::Six));
    }

    #[test]
    fn digit_short_digest() {
        let mut bytes = [0; 16];
        bytes[12..].copy_from_slice(&[0x80, 0x00, 0x01, 0x0f]);

        assert_eq!(271, super::digit(&bytes, Digits::Six));
    }

    #[test]
    fn code_display() {
        let code = OtpCode {
            code: 123,
            digits: Digits::Six,
        };
        assert_eq!("000123", code.to_string());

        let code = OtpCode {
            code: 81_804,
            digits: Digits::Eight,
        };
        assert_eq!("00081804", code.to_string());
    }

    #[test]
    fn rfc4226() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];

        for (counter, code) in (0..).zip(expected) {
            assert_eq!(
                code,
                hotp(RFC_SHA1, Algorithm::Sha1, counter, Digits::Six).to_string()
            );
        }
    }

    #[test]
    fn rfc6238() {
        let expected = [
            (59, "94287082", "46119246", "90693936"),
            (1_111_111_109, "07081804", "68084774", "25091201"),
            (1_234_567_890, "89005924", "91819424", "93441116"),
            (2_000_000_000, "69279037", "90698825", "38618901"),
            (20_000_000_000, "65353130", "77737706", "47863826"),
        ];

        for (time, sha1, sha256, sha512) in expected {
            let code = |secret, algorithm| {
                totp(secret, algorithm, 30, Digits::Eight, time)
                    .current
                    .code
                    .to_string()
            };

            assert_eq!(sha1, code(RFC_SHA1, Algorithm::Sha1), "SHA1 at {time}");
            assert_eq!(sha256, code(RFC_SHA256, Algorithm::Sha256), "SHA256 at {time}");
            assert_eq!(sha512, code(RFC_SHA512, Algorithm::Sha512), "SHA512 at {time}");
        }
    }

    #[test]
    fn totp_windows_line_up() {
        for period in [30, 45, 60] {
            for now in [0, 1, 29, 30, 59, 1_700_000_123] {
                let codes = totp(RFC_SHA1, Algorithm::Sha1, period, Digits::Six, now);
                let next = codes.next.unwrap();

                assert!(codes.current.window.contains(now));
                assert_eq!(codes.current.window.until, next.window.start);
                assert_eq!(period, next.window.until - next.window.start);
                assert_eq!(0, codes.current.window.start % period);
                assert_eq!(next.window.until, codes.expires());
            }
        }
    }

    #[test]
    fn totp_does_not_persist() {
        let mut token = token(Otp::Totp);
        let mut recorder = Recorder::default();

        let codes = generate_at(&mut token, &mut recorder, 59).unwrap();

        assert!(recorder.0.is_empty());
        assert_eq!("287082", codes.current.code.to_string());
        assert_eq!(Some("359152".to_owned()), codes.next.map(|c| c.code.to_string()));
    }

    #[test]
    fn zero_period_uses_default() {
        let mut token = token(Otp::Totp);
        token.period = 0;

        let codes = generate_at(&mut token, &mut Recorder::default(), 59).unwrap();
        assert_eq!(Window { start: 30, until: 60 }, codes.current.window);
    }

    #[test]
    fn hotp_persists_before_code() {
        let mut token = token(Otp::Hotp { counter: 0 });
        let mut recorder = Recorder::default();

        let first = generate_at(&mut token, &mut recorder, 1000).unwrap();
        assert_eq!("755224", first.current.code.to_string());
        assert_eq!(Window { start: 1000, until: 1030 }, first.current.window);
        assert_eq!(None, first.next);
        assert_eq!(Otp::Hotp { counter: 1 }, recorder.0[0].otp);
        assert_eq!(Otp::Hotp { counter: 1 }, token.otp);

        let second = generate_at(&mut token, &mut recorder, 1001).unwrap();
        assert_eq!("287082", second.current.code.to_string());
        assert_eq!(Otp::Hotp { counter: 2 }, recorder.0[1].otp);
    }

    #[test]
    fn hotp_failed_persist_yields_nothing() {
        let mut token = token(Otp::Hotp { counter: 5 });

        let result = generate_at(&mut token, &mut Failing, 1000);

        assert!(matches!(result, Err(Error::Persist(_))));
        assert_eq!(Otp::Hotp { counter: 5 }, token.otp);
    }

    #[test]
    fn active_code_follows_time() {
        let codes = totp(RFC_SHA1, Algorithm::Sha1, 30, Digits::Six, 59);

        assert_eq!(Some(&codes.current), codes.active(59));
        assert_eq!(codes.next.as_ref(), codes.active(60));
        assert_eq!(None, codes.active(90));
        assert_eq!(None, codes.active(29));
    }

    #[test]
    fn md5_codes_stay_in_range() {
        for counter in 0..256 {
            let code = hotp(RFC_SHA1, Algorithm::Md5, counter, Digits::Six);
            assert!(code.code < 1_000_000, "counter {counter}");
        }

        let codes = totp(RFC_SHA1, Algorithm::Md5, 30, Digits::Eight, 59);
        assert_eq!(8, codes.current.code.to_string().len());
    }

    #[test]
    fn huge_period_saturates() {
        let mut parsed = "otpauth://totp/a?secret=JBSWY3DPEHPK3PXP&period=18446744073709551615"
            .parse::<Token>()
            .unwrap();

        let codes = generate_at(&mut parsed, &mut Recorder::default(), 1_700_000_000).unwrap();
        assert_eq!(Window { start: 0, until: u64::MAX }, codes.current.window);
        assert!(codes.current.window.contains(1_700_000_000));
        assert_eq!(Some(u64::MAX), codes.next.map(|c| c.window.start));

        let mut token = token(Otp::Hotp { counter: 0 });
        token.period = u64::MAX;
        let codes = generate_at(&mut token, &mut Recorder::default(), 1_700_000_000).unwrap();
        assert_eq!(u64::MAX, codes.current.window.until);
    }

    #[test]
    fn exhausted_counter_fails() {
        let mut token = token(Otp::Hotp { counter: u64::MAX });
        let mut recorder = Recorder::default();

        let result = generate_at(&mut token, &mut recorder, 1000);

        assert!(matches!(result, Err(Error::CounterExhausted)));
        assert!(recorder.0.is_empty());
        assert_eq!(Otp::Hotp { counter: u64::MAX }, token.otp);
    }

    #[test]
    fn every_algorithm_generates() {
        for algorithm in Algorithm::ALL {
            let code = hotp(RFC_SHA1, algorithm, 1, Digits::Eight);
            assert!(code.code < 100_000_000);
            assert_eq!(8, code.to_string().len());
        }
    }
}
