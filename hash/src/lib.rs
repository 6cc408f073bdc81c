//! Content-addressed hashes (`Ref`) used as the identity of every persisted
//! record in the object store.
//!
//! A `Ref` is the sha1 of a record's canonical serialized bytes. It never
//! carries ancestry or ordering semantics by itself -- it's just an opaque,
//! 20-byte identity with a 40-hex-char display form.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Number of hex characters in a full `Ref`.
pub const HEX_LEN: usize = 40;
/// Number of hex characters in a `Ref`'s short (display-only) form.
pub const SHORT_LEN: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("ref must be {HEX_LEN} hex characters, got {0}")]
    WrongLength(usize),
    #[error("ref contains non-hex characters: {0:?}")]
    NotHex(String),
}

/// A 40-hex content address. Equality is byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ref([u8; 20]);

impl Ref {
    /// Hashes `bytes` (the canonical serialized form of a record) and
    /// returns its `Ref`.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        Ref(out)
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Ref(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// First 9 hex characters, for display only -- never use as identity.
    pub fn short(&self) -> String {
        self.to_string()[..SHORT_LEN].to_string()
    }

    /// The two-character shard prefix used to lay records out on disk
    /// (see the object store's on-disk layout).
    pub fn shard_prefix(&self) -> String {
        format!("{:02x}", self.0[0])
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({self})")
    }
}

impl FromStr for Ref {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HEX_LEN {
            return Err(HashParseError::WrongLength(s.len()));
        }
        let bytes =
            hex::decode(s).map_err(|_| HashParseError::NotHex(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Ref(out))
    }
}

impl TryFrom<&str> for Ref {
    type Error = HashParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ref {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hashes_are_deterministic() {
        let a = Ref::of(b"hello world");
        let b = Ref::of(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), HEX_LEN);
    }

    #[test]
    fn different_bytes_hash_differently() {
        assert_ne!(Ref::of(b"a"), Ref::of(b"b"));
    }

    #[test]
    fn short_form_is_prefix_of_full_form() {
        let r = Ref::of(b"component");
        assert!(r.to_string().starts_with(&r.short()));
        assert_eq!(r.short().len(), SHORT_LEN);
    }

    #[test]
    fn round_trips_through_string() {
        let r = Ref::of(b"round-trip");
        let s = r.to_string();
        let parsed: Ref = s.parse().unwrap();
        assert_eq!(r, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            "abcd".parse::<Ref>(),
            Err(HashParseError::WrongLength(4))
        );
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "z".repeat(HEX_LEN);
        assert!(matches!(bad.parse::<Ref>(), Err(HashParseError::NotHex(_))));
    }

    #[test]
    fn serializes_as_hex_string_json() {
        let r = Ref::of(b"json");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, format!("\"{r}\""));
        let back: Ref = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
