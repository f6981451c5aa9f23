//! # jur-core — Foundational Types for the Jurisd Stack
//!
//! This crate is the bedrock of the Jurisd attribute registry. It defines the
//! identifier and quantity newtypes, the canonical-byte pipeline every digest
//! flows through, and the error taxonomy shared by the whole workspace.
//! Every other crate depends on `jur-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Address`,
//!    `AttributeTypeId`, `AttributeValue`, `Amount` — no bare integers or
//!    strings for identifiers or money.
//!
//! 2. **`CanonicalBytes` newtype.** All digest computation (approval hashes,
//!    attribute-type commitments, state digests) flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!
//! 3. **String-serialized quantities.** `Amount` and `AttributeValue` are
//!    `u128` but serialize as decimal strings so canonical JSON never
//!    carries a number outside the interoperable integer range.
//!
//! 4. **UTC-only timestamps.** `Timestamp` enforces UTC with Z suffix and
//!    seconds precision, keeping canonical byte sequences deterministic.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jur-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod address;
pub mod digest;
pub mod error;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use address::{Address, Amount, AttributeTypeId, AttributeValue};
pub use digest::{sha256_digest, CanonicalBytes, ContentDigest};
pub use error::{CanonicalizationError, RegistryError, SourceFault};
pub use temporal::Timestamp;
