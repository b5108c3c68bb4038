//! # Keyfob Core
//!
//! Core component of **Keyfob** that is shared between all other components and serves as
//! building block. The main piece of interest is the [`Token`] and its related data. A token
//! describes a single entry in the store and contains all information needed to create new OTPs.
//!
//! Tokens are usually created by parsing an `otpauth://` provisioning URI through [`FromStr`].

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::{
    fmt::{self, Display},
    str::FromStr,
};

pub use keyfob_hash::Algorithm;
pub use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

pub use self::{
    key::{Key, MAX_KEY_LEN},
    url::ParseError,
};

mod key;
mod url;

/// Maximum amount of characters kept for the issuer and the name of a token.
pub const MAX_LABEL_LEN: usize = 63;
/// Period in seconds used when none (or `0`) is given.
pub const DEFAULT_PERIOD: u64 = 30;

/// Keyfob token that contains the information to create OTPs for a single account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Service that issued the token, may be empty.
    pub issuer: String,
    /// Account name within the issuer.
    pub name: String,
    /// The shared secret to generate correct OTPs.
    pub secret: Key,
    /// Fingerprint of the label, identifies the token within the store.
    pub id: u32,
    /// Amount of digits to produce as OTP.
    pub digits: Digits,
    /// Algorithm that is used to generate OTPs.
    pub algorithm: Algorithm,
    /// Seconds a code is shown. Time step for [`Otp::Totp`], display window for [`Otp::Hotp`].
    pub period: u64,
    /// The variation of OTP to use.
    pub otp: Otp,
}

impl Token {
    /// Full label in the form `issuer:name`, or only the name if there is no issuer.
    #[must_use]
    pub fn label(&self) -> String {
        if self.issuer.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.issuer, self.name)
        }
    }

    /// The period to use for calculations, falling back to [`DEFAULT_PERIOD`] if it's zero.
    #[must_use]
    pub fn effective_period(&self) -> u64 {
        if self.period == 0 {
            DEFAULT_PERIOD
        } else {
            self.period
        }
    }

    /// Render this token as provisioning URI, that parses back into the same token.
    #[must_use]
    pub fn to_uri(&self) -> String {
        url::render(self)
    }
}

impl FromStr for Token {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        url::parse(s)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issuer.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.issuer, self.name)
        }
    }
}

/// Base information about the OTP used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Otp {
    /// Counter based, using a counter as base of the OTP generation.
    ///
    /// The counter must be persisted before a code is shown, otherwise a crash could lead to the
    /// same code being issued twice.
    Hotp {
        /// Counter that serves as calculation base for the next OTP. Incremented by `1` after
        /// each use.
        counter: u64,
    },
    /// Time based, using the current time divided by the token's period.
    Totp,
}

/// Amount of digits in a generated code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Digits {
    #[default]
    Six,
    Eight,
}

impl Digits {
    /// `10^digits`, the modulus for the truncated code.
    #[must_use]
    pub const fn modulus(self) -> u32 {
        match self {
            Self::Six => 1_000_000,
            Self::Eight => 100_000_000,
        }
    }
}

impl From<Digits> for u8 {
    fn from(d: Digits) -> Self {
        match d {
            Digits::Six => 6,
            Digits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for Digits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(Self::Six),
            8 => Ok(Self::Eight),
            _ => Err(format!("unsupported amount of digits `{value}`")),
        }
    }
}

impl Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Stable identifier of a token label. `0` is reserved and never a valid token id.
#[must_use]
pub fn fingerprint(label: &str) -> u32 {
    keyfob_hash::murmur3_32(label.as_bytes())
}

/// Durable storage for a single token. Used to save the advanced counter of a HOTP token
/// before its code is revealed.
pub trait Persist {
    type Error: std::error::Error + Send + Sync + 'static;

    fn persist(&mut self, token: &Token) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn token() -> Token {
        Token {
            issuer: String::new(),
            name: "alice".to_owned(),
            secret: Key::new(b"12345678901234567890".to_vec()),
            id: fingerprint("alice"),
            digits: Digits::Six,
            algorithm: Algorithm::Sha1,
            period: 0,
            otp: Otp::Totp,
        }
    }

    #[test]
    fn label_without_issuer() {
        let mut token = token();
        assert_eq!("alice", token.label());
        assert_eq!("alice", token.to_string());

        token.issuer = "Example".to_owned();
        assert_eq!("Example:alice", token.label());
        assert_eq!("Example (alice)", token.to_string());
    }

    #[test]
    fn zero_period_falls_back() {
        let mut token = token();
        assert_eq!(DEFAULT_PERIOD, token.effective_period());
        token.period = 60;
        assert_eq!(60, token.effective_period());
    }

    #[test]
    fn digits_conversion() {
        assert_eq!(Digits::Eight, Digits::try_from(8).unwrap());
        assert!(Digits::try_from(7).is_err());
        assert_eq!(100_000_000, Digits::Eight.modulus());
    }

    #[test]
    fn record_roundtrip() {
        let mut token = token();
        token.otp = Otp::Hotp { counter: 42 };
        token.algorithm = Algorithm::Sha384;

        let bytes = rmp_serde::to_vec(&token).unwrap();
        assert_eq!(token, rmp_serde::from_slice::<Token>(&bytes).unwrap());
    }
}
