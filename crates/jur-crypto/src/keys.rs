//! # Ed25519 Keys and Address Derivation
//!
//! Key pairs for validator approval signing, plus the mapping from a public
//! key to the 20-byte [`Address`] it controls.
//!
//! ## Security Invariant
//!
//! - [`SigningKeyPair::sign`] accepts only `&CanonicalBytes`. There is no
//!   raw-byte signing path, so every signature in the stack covers bytes
//!   that went through the canonicalization pipeline.
//! - Private key material is never serialized; `Debug` for the key pair is
//!   redacted.
//!
//! ## Address Derivation
//!
//! `address = trailing 20 bytes of SHA-256(public key bytes)`. The hash here
//! runs over the fixed-width 32-byte key, not over canonical JSON; key bytes
//! have exactly one encoding already.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use jur_core::{Address, CanonicalBytes};

/// Errors from key handling and signature verification.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("malformed key material: {0}")]
    MalformedKey(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
}

/// A 32-byte Ed25519 public key, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigningPublicKey([u8; 32]);

impl SigningPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        decode_fixed::<32>(hex)
            .map(Self)
            .map_err(KeyError::MalformedKey)
    }

    /// The address this key controls: the trailing 20 bytes of the SHA-256
    /// of the raw key bytes.
    pub fn derive_address(&self) -> Address {
        let hash = Sha256::digest(self.0);
        let mut tail = [0u8; 20];
        tail.copy_from_slice(&hash[12..32]);
        Address::from_bytes(tail)
    }

    fn to_verifying_key(self) -> Result<ed25519_dalek::VerifyingKey, KeyError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| KeyError::MalformedKey(format!("not a valid curve point: {e}")))
    }
}

impl Serialize for SigningPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SigningPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for SigningPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningPublicKey({}..)", encode_hex(&self.0[..4]))
    }
}

impl std::fmt::Display for SigningPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A 64-byte Ed25519 signature, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        decode_fixed::<64>(hex)
            .map(Self)
            .map_err(KeyError::MalformedSignature)
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureBytes({}..)", encode_hex(&self.0[..4]))
    }
}

impl std::fmt::Display for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An Ed25519 key pair held by a validator.
///
/// Does not implement `Serialize`; the secret seed stays in memory.
pub struct SigningKeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl SigningKeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Rebuild a key pair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The 32-byte secret seed. Callers own the handling discipline;
    /// nothing in this crate writes it anywhere.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> SigningPublicKey {
        SigningPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address derived from this key pair's public key.
    pub fn address(&self) -> Address {
        self.public_key().derive_address()
    }

    /// Sign canonical bytes. Only `&CanonicalBytes` is accepted.
    pub fn sign(&self, data: &CanonicalBytes) -> SignatureBytes {
        SignatureBytes(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKeyPair(<secret>)")
    }
}

/// Verify a signature over canonical bytes under the given public key.
pub fn verify(
    data: &CanonicalBytes,
    signature: &SignatureBytes,
    public_key: &SigningPublicKey,
) -> Result<(), KeyError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(data.as_bytes(), &sig)
        .map_err(|e| KeyError::VerificationFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Hex helpers (fixed-width, no external hex crate)
// ---------------------------------------------------------------------------

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_fixed<const N: usize>(hex: &str) -> Result<[u8; N], String> {
    let hex = hex.trim();
    if hex.len() != 2 * N {
        return Err(format!("expected {} hex characters, got {}", 2 * N, hex.len()));
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|e| format!("invalid hex at position {}: {e}", 2 * i))?;
    }
    Ok(out)
}
