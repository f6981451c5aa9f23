//! # jur-crypto — Signing Material and Approvals
//!
//! The cryptographic layer of the Jurisd stack:
//!
//! - **Ed25519** key pairs, signing, and verification over canonical bytes.
//! - **Address derivation**: every public key maps to one 20-byte address,
//!   so a verified signature identifies its author on the registry's own
//!   terms.
//! - **Signed approvals**: the portable envelope a validator hands to a
//!   subject, authorizing exactly one attribute issuance.
//!
//! ## Crate Policy
//!
//! - Depends only on `jur-core` internally.
//! - Signing and verification accept `&CanonicalBytes` only; raw byte
//!   signing is not exposed.
//! - Private keys never implement `Serialize` and never appear in `Debug`
//!   output.
//! - No mocked cryptography in tests.

pub mod approval;
pub mod keys;

pub use approval::{ApprovalError, ApprovalMessage, ApprovalOrigin, SignedApproval};
pub use keys::{KeyError, SignatureBytes, SigningKeyPair, SigningPublicKey};
