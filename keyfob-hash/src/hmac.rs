//! Keyed hashing (RFC 2104) over any [`Algorithm`].

use crate::{Algorithm, Context, Digest, Error, MAX_BLOCK_SIZE};

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Streaming HMAC computation.
///
/// All working buffers live inline, so creating and finishing an instance never allocates.
#[derive(Clone)]
pub struct Hmac {
    inner: Context,
    outer: Context,
}

impl Hmac {
    /// Prepare the inner and outer hash states for `key`. Keys longer than the block size of the
    /// algorithm are hashed first, shorter keys are padded with zeroes.
    #[must_use]
    pub fn new(algorithm: Algorithm, key: &[u8]) -> Self {
        let block_size = algorithm.block_size();
        let mut block = [0_u8; MAX_BLOCK_SIZE];

        if key.len() > block_size {
            let digest = algorithm.digest(key);
            block[..digest.len()].copy_from_slice(&digest);
        } else {
            block[..key.len()].copy_from_slice(key);
        }

        let block = &block[..block_size];
        let mut pad = [0_u8; MAX_BLOCK_SIZE];

        let mut inner = algorithm.context();
        for (p, k) in pad.iter_mut().zip(block) {
            *p = k ^ IPAD;
        }
        inner.update(&pad[..block_size]);

        let mut outer = algorithm.context();
        for (p, k) in pad.iter_mut().zip(block) {
            *p = k ^ OPAD;
        }
        outer.update(&pad[..block_size]);

        Self { inner, outer }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    #[must_use]
    pub fn finalize(self) -> Digest {
        let inner = self.inner.finish();
        let mut outer = self.outer;
        outer.update(&inner);
        outer.finish()
    }
}

/// One-shot HMAC of `message` under `key`.
#[must_use]
pub fn hmac(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Digest {
    let mut mac = Hmac::new(algorithm, key);
    mac.update(message);
    mac.finalize()
}

/// Same as [`hmac`] but with the algorithm given by its numeric id, as found in stored records.
pub fn hmac_by_id(id: u8, key: &[u8], message: &[u8]) -> Result<Digest, Error> {
    Algorithm::try_from(id).map(|algorithm| hmac(algorithm, key, message))
}
