use std::fmt;

use secrecy::{ExposeSecret, Zeroize};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

/// Maximum length of a token secret in bytes.
pub const MAX_KEY_LEN: usize = 64;

/// The shared secret of a token. Wiped from memory when dropped and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    #[must_use]
    pub fn new(content: Vec<u8>) -> Self {
        Self(content)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for Key {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl ExposeSecret<Vec<u8>> for Key {
    fn expose_secret(&self) -> &Vec<u8> {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key([REDACTED; {}])", self.0.len())
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(self.expose_secret())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_byte_buf(KeyVisitor)
    }
}

struct KeyVisitor;

impl KeyVisitor {
    fn check<E: de::Error>(v: Vec<u8>) -> Result<Key, E> {
        if v.len() > MAX_KEY_LEN {
            return Err(E::invalid_length(v.len(), &"at most 64 bytes"));
        }
        Ok(Key(v))
    }
}

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("token secret represented as raw bytes")
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Self::check(Vec::from(v))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Self::check(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_content() {
        let key = Key::new(b"hunter2".to_vec());
        assert_eq!("Key([REDACTED; 7])", format!("{key:?}"));
    }

    #[test]
    fn msgpack_roundtrip() {
        let key = Key::new(vec![1, 2, 3]);
        let bytes = rmp_serde::to_vec(&key).unwrap();
        assert_eq!(key, rmp_serde::from_slice::<Key>(&bytes).unwrap());
    }

    #[test]
    fn rejects_oversized() {
        let bytes = rmp_serde::to_vec(&Key::new(vec![0; 65])).unwrap();
        assert!(rmp_serde::from_slice::<Key>(&bytes).is_err());
    }
}
