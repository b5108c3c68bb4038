//! # Keyfob Hash
//!
//! Hash primitives of **Keyfob**, implemented from scratch so that a token can use any of the
//! algorithms an `otpauth://` URI may name. The [`Algorithm`] enum is the registry of supported
//! hashes, [`Context`] a running computation of any of them and [`Digest`] its fixed-capacity
//! result. On top of that sit the generic [`Hmac`] and the non-cryptographic [`murmur3_32`]
//! fingerprint.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::unreadable_literal,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions
)]

use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

pub use self::{
    hmac::{hmac, hmac_by_id, Hmac},
    md5::Md5,
    murmur3::murmur3_32,
    sha1::Sha1,
    sha256::Sha256,
    sha512::Sha512,
};

mod block;
mod hmac;
mod md5;
mod murmur3;
mod sha1;
mod sha256;
mod sha512;

/// Largest block size of all supported algorithms.
pub const MAX_BLOCK_SIZE: usize = Sha512::BLOCK_SIZE;
/// Largest digest size of all supported algorithms.
pub const MAX_OUTPUT_SIZE: usize = Sha512::OUTPUT_SIZE;

/// Errors that can occur when looking up an algorithm.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No algorithm is registered under the given name.
    #[error("unknown hash algorithm `{0}`")]
    UnknownAlgorithm(String),
    /// No algorithm is registered under the given numeric id.
    #[error("unknown hash algorithm id {0}")]
    UnknownId(u8),
    /// A checksum wasn't of the form `<algorithm>:<hex digest>`.
    #[error("checksum `{0}` is missing the `<algorithm>:` prefix")]
    MalformedChecksum(String),
}

/// Hash algorithms known to **Keyfob**.
///
/// Stored as a single byte, using the ids `1` to `6` in declaration order. The value `0` is never
/// assigned and denotes an unknown algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// All algorithms, in id order.
    pub const ALL: [Self; 6] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Canonical name, as used in `otpauth://` URIs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Size of the produced digest in bytes.
    #[must_use]
    pub const fn output_size(self) -> usize {
        match self {
            Self::Md5 => Md5::OUTPUT_SIZE,
            Self::Sha1 => Sha1::OUTPUT_SIZE,
            Self::Sha224 => Sha256::OUTPUT_SIZE_224,
            Self::Sha256 => Sha256::OUTPUT_SIZE,
            Self::Sha384 => Sha512::OUTPUT_SIZE_384,
            Self::Sha512 => Sha512::OUTPUT_SIZE,
        }
    }

    /// Size of the internal block in bytes.
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Md5 => Md5::BLOCK_SIZE,
            Self::Sha1 => Sha1::BLOCK_SIZE,
            Self::Sha224 | Self::Sha256 => Sha256::BLOCK_SIZE,
            Self::Sha384 | Self::Sha512 => Sha512::BLOCK_SIZE,
        }
    }

    /// Start a new, empty hash computation.
    #[must_use]
    pub const fn context(self) -> Context {
        match self {
            Self::Md5 => Context::Md5(Md5::new()),
            Self::Sha1 => Context::Sha1(Sha1::new()),
            Self::Sha224 => Context::Sha224(Sha256::new_224()),
            Self::Sha256 => Context::Sha256(Sha256::new()),
            Self::Sha384 => Context::Sha384(Sha512::new_384()),
            Self::Sha512 => Context::Sha512(Sha512::new()),
        }
    }

    /// Hash `data` in one go.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Digest {
        let mut ctx = self.context();
        ctx.update(data);
        ctx.finish()
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_owned()))
    }
}

impl From<Algorithm> for u8 {
    fn from(a: Algorithm) -> Self {
        match a {
            Algorithm::Md5 => 1,
            Algorithm::Sha1 => 2,
            Algorithm::Sha224 => 3,
            Algorithm::Sha256 => 4,
            Algorithm::Sha384 => 5,
            Algorithm::Sha512 => 6,
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|a| u8::from(*a) == value)
            .ok_or(Error::UnknownId(value))
    }
}

/// Working state of a running hash computation.
///
/// Created through [`Algorithm::context`], fed with [`Self::update`] and consumed by
/// [`Self::finish`].
#[derive(Clone)]
pub enum Context {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha256),
    Sha256(Sha256),
    Sha384(Sha512),
    Sha512(Sha512),
}

impl Context {
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        match self {
            Self::Md5(_) => Algorithm::Md5,
            Self::Sha1(_) => Algorithm::Sha1,
            Self::Sha224(_) => Algorithm::Sha224,
            Self::Sha256(_) => Algorithm::Sha256,
            Self::Sha384(_) => Algorithm::Sha384,
            Self::Sha512(_) => Algorithm::Sha512,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha224(h) | Self::Sha256(h) => h.update(data),
            Self::Sha384(h) | Self::Sha512(h) => h.update(data),
        }
    }

    #[must_use]
    pub fn finish(self) -> Digest {
        match self {
            Self::Md5(h) => Digest::new(&h.finish()),
            Self::Sha1(h) => Digest::new(&h.finish()),
            Self::Sha224(h) => Digest::new(&h.finish()[..Sha256::OUTPUT_SIZE_224]),
            Self::Sha256(h) => Digest::new(&h.finish()),
            Self::Sha384(h) => Digest::new(&h.finish()[..Sha512::OUTPUT_SIZE_384]),
            Self::Sha512(h) => Digest::new(&h.finish()),
        }
    }
}

/// Output of a hash or HMAC computation. Dereferences to the digest bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Digest {
    bytes: [u8; MAX_OUTPUT_SIZE],
    len: usize,
}

impl Digest {
    fn new(value: &[u8]) -> Self {
        let mut bytes = [0; MAX_OUTPUT_SIZE];
        bytes[..value.len()].copy_from_slice(value);

        Self {
            bytes,
            len: value.len(),
        }
    }

    /// Lowercase hex representation, two characters per byte.
    #[must_use]
    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(self)
    }
}

impl Deref for Digest {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes[..self.len]
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Digest").field(&self.to_hex()).finish()
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Check `data` against a checksum of the form `<algorithm>:<hex digest>`, for example
/// `sha256:ba7816bf...`. The algorithm name and the hex digits are compared case-insensitively.
pub fn verify(checksum: &str, data: &[u8]) -> Result<bool, Error> {
    let (name, hex) = checksum
        .split_once(':')
        .ok_or_else(|| Error::MalformedChecksum(checksum.to_owned()))?;
    let algorithm = name.parse::<Algorithm>()?;

    Ok(algorithm.digest(data).to_hex().eq_ignore_ascii_case(hex))
}
