//! # Identities and Quantities
//!
//! Newtype wrappers for the identifiers and amounts that flow through every
//! registry operation. Each wrapper fixes one wire representation so that
//! canonical serialization is deterministic across the whole stack.
//!
//! ## Wire Forms
//!
//! - [`Address`]: `0x` + 40 lowercase hex characters (20 bytes).
//! - [`Amount`] and [`AttributeValue`]: decimal strings. JSON numbers cannot
//!   carry a full 128-bit range, and floats are rejected by canonicalization,
//!   so quantities always travel as strings.
//! - [`AttributeTypeId`]: a plain JSON integer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A 20-byte account identity.
///
/// Addresses identify every party a registry knows about: the owner,
/// validators, subjects, operators, and fund recipients. The all-zero
/// address is reserved and never addressable; constructors in higher
/// layers reject it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// The reserved all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for the reserved all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Canonical form: `0x` followed by 40 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for byte in &self.0 {
            out.push(HEX_CHARS[(byte >> 4) as usize] as char);
            out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        out
    }

    /// Parse an address from hex. The `0x` prefix is optional and hex
    /// digits of either case are accepted; the stored form is binary, so
    /// re-encoding always yields the canonical lowercase string.
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressParseError::BadLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        let raw = digits.as_bytes();
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = hex_value(raw[2 * i]).ok_or(AddressParseError::BadCharacter(raw[2 * i] as char))?;
            let lo = hex_value(raw[2 * i + 1])
                .ok_or(AddressParseError::BadCharacter(raw[2 * i + 1] as char))?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Serialized as the canonical hex string, which also makes Address valid
// as a JSON map key.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Error parsing an [`Address`] from hex.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("expected 40 hex characters, got {0}")]
    BadLength(usize),
    #[error("invalid hex character {0:?}")]
    BadCharacter(char),
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Identifier of an attribute type within one registry.
///
/// Allocated sequentially from zero by the directory and never reused.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AttributeTypeId(pub u64);

impl fmt::Display for AttributeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttributeTypeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(AttributeTypeId)
    }
}

/// The value recorded for an attribute: an opaque 128-bit payload whose
/// meaning is fixed by the attribute type (a flag, a code point, a packed
/// digest fragment).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AttributeValue(pub u128);

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AttributeValue {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(AttributeValue)
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(U128Visitor).map(AttributeValue)
    }
}

/// A non-negative quantity of the ambient settlement unit.
///
/// All fee, stake, and transfer arithmetic is checked or saturating; plain
/// `+`/`-` are deliberately not implemented so overflow handling is always
/// explicit at the call site.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// Multiply a per-unit rate by a unit count, saturating at the top of
    /// the range. Used for gas-style rebate computations where the result
    /// is capped by a held stake anyway.
    pub fn saturating_mul(self, units: u128) -> Amount {
        Amount(self.0.saturating_mul(units))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Amount)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(U128Visitor).map(Amount)
    }
}

/// Accepts decimal strings (the canonical form) and plain integers, so
/// hand-edited state files still load.
struct U128Visitor;

impl serde::de::Visitor<'_> for U128Visitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or non-negative integer")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u128, E> {
        v.parse::<u128>()
            .map_err(|_| E::custom(format!("invalid decimal quantity: {v:?}")))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }
}
