//! # Keyfob Store
//!
//! The storage component of **Keyfob** keeps a bounded, user ordered list of tokens on top of a
//! simple key addressed [`Backend`]. Every token is saved as its own record under its id, while
//! the display [`Order`] lives under the reserved key `0`.
//!
//! Each operation loads the order, changes it in memory and writes it back. There is no caching
//! in between, so the backend is always the single source of truth.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::{
    fmt::{self, Display},
    io,
};

use keyfob_core::{Persist, Token};
use serde::{de::IgnoredAny, Serialize};
use tracing::{debug, warn};

pub use self::{
    backend::{Backend, FileBackend, MemoryBackend},
    order::Order,
};

mod backend;
pub mod order;

/// Key of the order record. Also the one id a token can never have.
pub const ORDER_KEY: u32 = 0;

/// Errors that can occur when working with the token store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token has the reserved id `0`.
    #[error("token id 0 is reserved")]
    ReservedId,
    /// A token with the same id is already stored.
    #[error("a token with id {0:#010x} already exists")]
    Duplicate(u32),
    /// All slots of the store are in use.
    #[error("the store is full, it can't hold more than {0} tokens")]
    CapacityExceeded(u8),
    /// The token isn't part of the store or its record can't be used.
    #[error("token not found")]
    NotFound,
    /// A position outside the stored tokens was given.
    #[error("position {position} is out of range, the store has {count} tokens")]
    OutOfRange { position: usize, count: usize },
    /// Unrecognized version of a token record. This can usually only happen if the record was
    /// written by a newer release.
    #[error("unknown record version {0}")]
    UnknownVersion(u32),
    /// Failed to find the home directory of the executing user.
    #[error("failed to find the home folder")]
    HomefolderNotFound,
    /// An I/O related error happened.
    #[error("I/O bound error")]
    Io(#[from] io::Error),
    /// Encoding of a record failed.
    #[error("failed to encode content")]
    Encode(#[from] rmp_serde::encode::Error),
    /// Decoding of a record failed.
    #[error("failed to decode content")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Different versions of the token record. This enum must be extended and according conversion
/// implemented, whenever the record format has been changed in a breaking manner.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Version {
    /// The current and only format version of token records.
    V0,
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V0 => "v0",
        })
    }
}

impl From<Version> for u32 {
    fn from(v: Version) -> Self {
        match v {
            Version::V0 => 0,
        }
    }
}

impl TryFrom<u32> for Version {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::V0),
            _ => Err(Error::UnknownVersion(value)),
        }
    }
}

/// Settings of a [`TokenStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum amount of tokens.
    pub capacity: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 8 }
    }
}

#[derive(Serialize)]
struct RecordRef<'a> {
    version: u32,
    token: &'a Token,
}

/// Persistent, bounded and reorderable list of tokens.
///
/// Positions are logical: `0` is the most recently added token.
pub struct TokenStore<B> {
    backend: B,
    config: StoreConfig,
}

impl<B: Backend> TokenStore<B> {
    /// Create a store with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Whether a token with the same id is stored.
    pub fn exists(&self, token: &Token) -> bool {
        token.id != ORDER_KEY
            && self
                .load_order()
                .map(|order| order.contains(token.id))
                .unwrap_or_default()
    }

    /// Save a new token at position 0.
    pub fn add(&mut self, token: &Token) -> Result<(), Error> {
        if token.id == ORDER_KEY {
            return Err(Error::ReservedId);
        }

        let mut order = self.load_order()?;
        if order.contains(token.id) {
            return Err(Error::Duplicate(token.id));
        }
        if !order.push(token.id) {
            return Err(Error::CapacityExceeded(self.config.capacity));
        }

        self.write_token(token)?;

        if let Err(e) = self.save_order(&order) {
            warn!(id = token.id, error = ?e, "failed saving order, removing new token record");
            if let Err(e) = self.backend.delete(token.id) {
                warn!(id = token.id, error = ?e, "failed removing orphaned token record");
            }
            return Err(e);
        }

        debug!(id = token.id, count = order.len(), "added token");
        Ok(())
    }

    /// Remove a token. All tokens after it move up by one position.
    pub fn del(&mut self, token: &Token) -> Result<(), Error> {
        let mut order = self.load_order()?;
        if !order.remove(token.id) {
            return Err(Error::NotFound);
        }

        self.save_order(&order)?;
        self.backend.delete(token.id)?;

        debug!(id = token.id, count = order.len(), "deleted token");
        Ok(())
    }

    /// Load the token at the logical `position`.
    ///
    /// A missing record or one written in an unknown format is reported as [`Error::NotFound`].
    pub fn get(&self, position: usize) -> Result<Token, Error> {
        let order = self.load_order()?;
        let id = order.get(position).ok_or(Error::OutOfRange {
            position,
            count: order.len(),
        })?;

        let Some(data) = self.backend.read(id)? else {
            warn!(id, position, "token record is missing");
            return Err(Error::NotFound);
        };

        // Check the version alone first, as the rest may not be readable for other versions.
        let (version, _) = rmp_serde::from_slice::<(u32, IgnoredAny)>(&data)?;
        if let Err(e) = Version::try_from(version) {
            warn!(id, position, error = %e, "skipping token record");
            return Err(Error::NotFound);
        }

        let (_, token) = rmp_serde::from_slice::<(u32, Token)>(&data)?;
        Ok(token)
    }

    /// Amount of stored tokens. An unreadable order counts as empty.
    pub fn count(&self) -> usize {
        self.load_order().map(|order| order.len()).unwrap_or_default()
    }

    /// Logical position of `token`, if stored.
    pub fn position(&self, token: &Token) -> Option<usize> {
        self.load_order().ok()?.position(token.id)
    }

    /// Move the token at `from` to `to`, shifting the ones in between by one position.
    pub fn move_token(&mut self, from: usize, to: usize) -> Result<(), Error> {
        if from == to {
            return Ok(());
        }

        let mut order = self.load_order()?;
        let count = order.len();
        for position in [from, to] {
            if position >= count {
                return Err(Error::OutOfRange { position, count });
            }
        }

        order.move_entry(from, to);
        self.save_order(&order)?;

        debug!(from, to, "moved token");
        Ok(())
    }

    /// Overwrite the record of an already stored token.
    pub fn update(&mut self, token: &Token) -> Result<(), Error> {
        if token.id == ORDER_KEY {
            return Err(Error::ReservedId);
        }
        if !self.load_order()?.contains(token.id) {
            return Err(Error::NotFound);
        }

        self.write_token(token)
    }

    /// All tokens in logical order, paired with their position.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Result<Token, Error>)> + '_ {
        (0..self.count()).map(move |position| (position, self.get(position)))
    }

    fn load_order(&self) -> Result<Order, Error> {
        let mut order = match self.backend.read(ORDER_KEY)? {
            Some(data) => rmp_serde::from_slice::<Order>(&data)?,
            None => Order::new(self.config.capacity),
        };
        order.fit(self.config.capacity);

        Ok(order)
    }

    fn save_order(&mut self, order: &Order) -> Result<(), Error> {
        let data = rmp_serde::to_vec(order)?;
        self.backend.write(ORDER_KEY, &data).map_err(Into::into)
    }

    fn write_token(&mut self, token: &Token) -> Result<(), Error> {
        let data = rmp_serde::to_vec(&RecordRef {
            version: Version::V0.into(),
            token,
        })?;
        self.backend.write(token.id, &data).map_err(Into::into)
    }
}

impl<B: Backend> Persist for TokenStore<B> {
    type Error = Error;

    fn persist(&mut self, token: &Token) -> Result<(), Self::Error> {
        self.update(token)
    }
}
