//! # Canonical Bytes and Content Digests
//!
//! Deterministic byte production and hashing for everything the registry
//! commits to: approval messages, attribute type definitions, and whole
//! registry snapshots.
//!
//! ## Security Invariant
//!
//! [`CanonicalBytes`] has a private inner field; the only constructor is
//! [`CanonicalBytes::new`], which rejects floats and serializes through
//! RFC 8785 (JSON Canonicalization Scheme). [`sha256_digest`] accepts only
//! `&CanonicalBytes`, never raw `&[u8]`, so no code path can hash bytes
//! that skipped canonicalization. Two parties that agree on a value
//! therefore always agree on its digest.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is [`CanonicalBytes::new`].
/// - The bytes are valid UTF-8 JSON with sorted object keys and compact
///   separators (RFC 8785).
/// - No float ever reaches the output; quantities are integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// [`CanonicalizationError::FloatRejected`] if the value tree contains a
    /// float anywhere; [`CanonicalizationError::SerializationFailed`] if
    /// JSON or JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk the value tree and refuse any float.
///
/// Floats have locale- and platform-sensitive rendering edge cases that
/// break cross-implementation digest agreement, so they are banned outright
/// rather than normalized. Integers pass through; 128-bit quantities travel
/// as decimal strings and are never seen here as numbers.
fn reject_floats(value: &serde_json::Value) -> Result<(), CanonicalizationError> {
    match value {
        serde_json::Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                reject_floats(v)?;
            }
            Ok(())
        }
        serde_json::Value::Array(items) => {
            for v in items {
                reject_floats(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// A 32-byte SHA-256 digest of canonical bytes.
///
/// Serialized as 64 lowercase hex characters. Orders by byte value, so
/// digest sets and maps have a deterministic wire form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse from 64 hex characters, either case.
    pub fn from_hex(s: &str) -> Result<Self, DigestParseError> {
        if s.len() != 64 {
            return Err(DigestParseError::BadLength(s.len()));
        }
        let raw = s.as_bytes();
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_nibble(raw[2 * i]).ok_or(DigestParseError::BadCharacter(raw[2 * i] as char))?;
            let lo = hex_nibble(raw[2 * i + 1])
                .ok_or(DigestParseError::BadCharacter(raw[2 * i + 1] as char))?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Error parsing a [`ContentDigest`] from hex.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DigestParseError {
    #[error("expected 64 hex characters, got {0}")]
    BadLength(usize),
    #[error("invalid hex character {0:?}")]
    BadCharacter(char),
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Compute a SHA-256 digest over canonical bytes.
///
/// The signature accepts only [`CanonicalBytes`], so every digest in the
/// stack is guaranteed to have passed through the canonicalization pipeline.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::from_bytes(bytes)
}
